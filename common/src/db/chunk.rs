use itertools::{IntoChunks, Itertools};
use sea_orm::{ActiveModelTrait, EntityTrait, Iterable};

/// The maximum number of bind parameters a single statement may carry.
pub const MAX_PARAMETERS: usize = u16::MAX as usize;

pub trait EntityChunkedIter: Sized {
    type Item: ActiveModelTrait;

    fn chunked(self) -> IntoChunks<impl Iterator<Item = Self::Item>>;
}

impl<T> EntityChunkedIter for T
where
    T: IntoIterator,
    <T as IntoIterator>::Item: ActiveModelTrait,
{
    type Item = T::Item;

    fn chunked(self) -> IntoChunks<impl Iterator<Item = Self::Item>> {
        chunked(self)
    }
}

/// Chunk active models so that one chunk never exceeds the bind parameter limit of an insert.
pub fn chunked<M, I>(i: I) -> IntoChunks<impl Iterator<Item = I::Item>>
where
    M: ActiveModelTrait,
    I: IntoIterator<Item = M>,
{
    chunked_with(<M::Entity as EntityTrait>::Column::iter().count(), i)
}

/// Chunk items, where each item binds `values` parameters.
pub fn chunked_with<I>(values: usize, i: I) -> IntoChunks<impl Iterator<Item = I::Item>>
where
    I: IntoIterator,
{
    i.into_iter().chunks(chunk_size(values))
}

/// The number of items per chunk, when each item binds `values` parameters.
pub fn chunk_size(values: usize) -> usize {
    (MAX_PARAMETERS / values.max(1)).saturating_sub(8).max(1)
}
