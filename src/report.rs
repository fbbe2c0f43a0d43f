use crate::algorithm::AraIteration;
use crate::common::SearchNode;

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// One node per line, start first.
pub fn format_path<'a, N: SearchNode + 'a>(nodes: impl IntoIterator<Item = &'a N>) -> String {
    nodes
        .into_iter()
        .map(|node| node.to_log_string() + "\n")
        .collect()
}

/// Writes the path log to `path`, creating missing parent directories.
pub fn write_path<'a, N: SearchNode + 'a>(
    path: &str,
    nodes: impl IntoIterator<Item = &'a N>,
) -> Result<()> {
    write_file(path, &format_path(nodes))?;
    debug!("wrote path to {path}");
    Ok(())
}

/// Writes the ARA* iterations as a JSON array.
pub fn write_ara_history(path: &str, history: &[AraIteration]) -> Result<()> {
    let json = serde_json::to_string_pretty(history)?;
    write_file(path, &json)?;
    debug!("wrote {} ARA* iterations to {path}", history.len());
    Ok(())
}

fn write_file(path: &str, contents: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create directory {}", parent.display()))?;
        }
    }
    let file = File::create(path).with_context(|| format!("cannot create {path}"))?;
    let mut writer = io::BufWriter::new(file);
    writer.write_all(contents.as_bytes())?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::footstep::{Foot, FootstepNode};
    use crate::domain::grid::GridNode;

    #[test]
    fn test_format_grid_path() {
        let nodes = [GridNode::new(7, 9), GridNode::new(6, 8), GridNode::new(5, 8)];
        assert_eq!(format_path(&nodes), "7 9\n6 8\n5 8\n");
        let empty: [GridNode; 0] = [];
        assert_eq!(format_path(&empty), "");
    }

    #[test]
    fn test_format_footstep_path() {
        let nodes = [
            FootstepNode::new(0.0, 0.0, 0.0, Foot::Left),
            FootstepNode::new(0.08, 0.09, 0.5, Foot::Right),
        ];
        assert_eq!(format_path(&nodes), "0 0 0 left\n0.08 0.09 0.5 right\n");
    }

    #[test]
    fn test_write_files() {
        let dir = std::env::temp_dir().join(format!("planning_report_{}", std::process::id()));
        let path_file = dir.join("nested").join("path.txt");
        let path_file = path_file.to_string_lossy();
        write_path(&path_file, &[GridNode::new(1, 2)]).unwrap();
        assert_eq!(fs::read_to_string(path_file.as_ref()).unwrap(), "1 2\n");

        let history = vec![AraIteration {
            w: 2.5,
            path_length: 10,
            path_costs: 10.5,
            expanded_nodes: 42,
            elapsed_secs: 0.25,
        }];
        let history_file = dir.join("history.json");
        let history_file = history_file.to_string_lossy();
        write_ara_history(&history_file, &history).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(history_file.as_ref()).unwrap()).unwrap();
        assert_eq!(json[0]["w"], 2.5);
        assert_eq!(json[0]["expanded_nodes"], 42);

        fs::remove_dir_all(&dir).unwrap();
    }
}
