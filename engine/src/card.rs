use crate::error::{Error, Result};
use std::path::Path;

pub const MAX_CARDS: i32 = 32;
const PROC_ASOUND: &str = "/proc/asound";

/// Resolves a card given either its decimal index or its id string.
pub fn card_index(name: &str) -> Result<i32> {
    card_index_in(Path::new(PROC_ASOUND), name)
}

pub(crate) fn card_index_in(root: &Path, name: &str) -> Result<i32> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid("empty card name"));
    }
    if let Ok(idx) = name.parse::<i32>() {
        if (0..MAX_CARDS).contains(&idx) {
            return Ok(idx);
        }
        return Err(Error::NoEntity(format!("card {idx}")));
    }
    // /proc/asound/<id> is a symlink to cardN
    let target = std::fs::read_link(root.join(name))
        .map_err(|_| Error::NoEntity(format!("card '{name}'")))?;
    target
        .file_name()
        .and_then(|f| f.to_str())
        .and_then(|f| f.strip_prefix("card"))
        .and_then(|n| n.parse::<i32>().ok())
        .filter(|idx| (0..MAX_CARDS).contains(idx))
        .ok_or_else(|| Error::NoEntity(format!("card '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_names_are_indices() {
        let root = Path::new("/nonexistent");
        assert_eq!(card_index_in(root, "0").unwrap(), 0);
        assert_eq!(card_index_in(root, " 3 ").unwrap(), 3);
        assert!(matches!(card_index_in(root, "32"), Err(Error::NoEntity(_))));
        assert!(matches!(card_index_in(root, ""), Err(Error::Invalid(_))));
    }

    #[test]
    fn symbolic_names_follow_the_proc_link() {
        let dir = std::env::temp_dir().join(format!("sndhw-card-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("card2")).unwrap();
        std::os::unix::fs::symlink("card2", dir.join("PCH")).unwrap();
        assert_eq!(card_index_in(&dir, "PCH").unwrap(), 2);
        assert!(matches!(
            card_index_in(&dir, "Missing"),
            Err(Error::NoEntity(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
