#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Ingestion")]
pub struct IngestorConfig {
    /// Attach ingested occurrences to the license policy dismissals covering them.
    #[arg(
        id = "update-policy-dismissals",
        long,
        env = "SBOM_UPDATE_POLICY_DISMISSALS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub update_policy_dismissals: bool,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            update_policy_dismissals: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;

    #[derive(clap::Parser)]
    struct Cli {
        #[command(flatten)]
        ingestor: IngestorConfig,
    }

    #[test]
    fn dismissal_updates_default_on() {
        let cli = Cli::try_parse_from(["test"]).unwrap();
        assert!(cli.ingestor.update_policy_dismissals);
    }

    #[test]
    fn dismissal_updates_can_be_disabled() {
        let cli = Cli::try_parse_from(["test", "--update-policy-dismissals", "false"]).unwrap();
        assert!(!cli.ingestor.update_policy_dismissals);
    }
}
