use std::path::Path;

use tokio::io::AsyncReadExt;

/// Reads the markdown notes from a file, or from stdin when `path` is `-`.
pub async fn read_notes(path: &Path) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        let mut markdown = String::new();
        tokio::io::stdin().read_to_string(&mut markdown).await?;
        return Ok(markdown);
    }

    tokio::fs::read_to_string(path).await
}
