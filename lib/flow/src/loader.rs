//! Loading flow definitions from YAML source, with content-hash tracking.

use crate::error::LoadError;
use crate::model::{Action, Flow, Input};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;

/// On-disk YAML shape, matching the external flow definition format. Kept
/// distinct from [`Flow`] because `metadata.id`/`metadata.cron` rename on
/// the way into the domain model, and `checksum` is never authored by hand.
#[derive(Debug, Deserialize)]
struct FlowFile {
    metadata: FlowMetadata,
    #[serde(default)]
    inputs: Vec<Input>,
    actions: Vec<Action>,
}

#[derive(Debug, Deserialize)]
struct FlowMetadata {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    cron: Option<String>,
}

/// Computes the hex-encoded SHA-256 digest of raw flow source bytes.
///
/// Used both by the loader to stamp a freshly-parsed [`Flow`] and by
/// ingestion callers comparing against a persisted record's checksum to
/// decide between `CreateFlow`/`UpdateFlow`/no-op.
#[must_use]
pub fn checksum(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(s, "{byte:02x}").expect("writing to a String never fails");
    }
    s
}

/// Parses flow YAML source bytes into a [`Flow`], stamping its checksum.
///
/// # Errors
///
/// Returns [`LoadError::Yaml`] if `source` is not valid flow YAML.
pub fn load_from_bytes(source: &[u8]) -> Result<Flow, LoadError> {
    let file: FlowFile = serde_yaml::from_slice(source)?;
    Ok(Flow {
        slug: file.metadata.id,
        name: file.metadata.name,
        description: file.metadata.description,
        checksum: checksum(source),
        cron_schedule: file.metadata.cron,
        inputs: file.inputs,
        actions: file.actions,
    })
}

/// Reads and parses a flow definition from a YAML file on disk.
///
/// # Errors
///
/// Returns [`LoadError::Io`] if the file cannot be read, or
/// [`LoadError::Yaml`] if its contents are not valid flow YAML.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Flow, LoadError> {
    let bytes = std::fs::read(path)?;
    load_from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
metadata:
  id: deploy-app
  name: Deploy App
  description: Deploys the app to a fleet of nodes
  cron: "*/15 * * * *"
inputs:
  - name: version
    type: string
    required: true
actions:
  - id: build
    executor: script
    script:
      - "echo building {{ inputs.version }}"
"#;

    #[test]
    fn loads_metadata_inputs_and_actions() {
        let flow = load_from_bytes(SAMPLE.as_bytes()).expect("load");
        assert_eq!(flow.slug, "deploy-app");
        assert_eq!(flow.name, "Deploy App");
        assert_eq!(flow.cron_schedule.as_deref(), Some("*/15 * * * *"));
        assert_eq!(flow.inputs.len(), 1);
        assert_eq!(flow.actions.len(), 1);
        assert_eq!(flow.actions[0].id, "build");
    }

    #[test]
    fn checksum_changes_iff_source_changes() {
        let flow_a = load_from_bytes(SAMPLE.as_bytes()).unwrap();
        let flow_b = load_from_bytes(SAMPLE.as_bytes()).unwrap();
        assert_eq!(flow_a.checksum, flow_b.checksum);

        let mutated = SAMPLE.replace("Deploy App", "Deploy App v2");
        let flow_c = load_from_bytes(mutated.as_bytes()).unwrap();
        assert_ne!(flow_a.checksum, flow_c.checksum);
    }

    #[test]
    fn rejects_malformed_yaml() {
        let result = load_from_bytes(b"not: [valid");
        assert!(result.is_err());
    }

    #[test]
    fn loads_from_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let flow = load_from_file(&path).expect("load");
        assert_eq!(flow.slug, "deploy-app");
    }
}
