/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use oum_sequencer::{ConfigError, GroupResolver, SequencerConfig};
use std::net::SocketAddr;
use std::path::Path;

#[cfg(test)]
mod tests {
    use super::*;

    fn example_path() -> &'static Path {
        Path::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/config/sequencer.example.json"
        ))
    }

    #[test]
    fn test_example_config_loads() {
        let config = SequencerConfig::from_file(example_path()).unwrap();
        assert_eq!(config.num_groups, 2);
        assert_eq!(config.groups.len(), 2);
        assert_eq!(config.destinations.len(), 2);

        let resolver = GroupResolver::from_config(&config);
        let destination: SocketAddr = "10.100.1.1:12345".parse().unwrap();
        let resolution = resolver.resolve(&destination).unwrap();
        assert_eq!(resolution.group_id, 1);
        assert_eq!(resolution.fan_out.len(), 3);
    }

    #[test]
    fn test_example_config_round_trips_through_json() {
        let config = SequencerConfig::from_file(example_path()).unwrap();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert_eq!(SequencerConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let result = SequencerConfig::from_json_str(
            r#"{
                "num_groups": 1,
                "groups": [{ "id": 0, "replicas": [] }],
                "destinations": []
            }"#,
        );
        assert!(matches!(result, Err(ConfigError::EmptyFanOut(0))));

        let result = SequencerConfig::from_json_str(r#"{ "num_groups": "two" }"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
