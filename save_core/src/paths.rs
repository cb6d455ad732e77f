use std::path::{PathBuf, MAIN_SEPARATOR};

/// Clean up a directory path pasted by a user.
///
/// Drops commas and quote characters, trims surrounding whitespace and
/// rewrites both `\` and `/` to the platform separator.
pub fn sanitize_directory(input: &str) -> PathBuf {
    let stripped: String = input
        .chars()
        .filter(|c| !matches!(c, ',' | '"' | '\''))
        .collect();
    let normalised: String = stripped
        .trim()
        .chars()
        .map(|c| if c == '\\' || c == '/' { MAIN_SEPARATOR } else { c })
        .collect();
    PathBuf::from(normalised)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_quotes_and_commas() {
        let sep = MAIN_SEPARATOR;
        let path = sanitize_directory("  \"C:\\Users\\me\\Saves\",  ");
        assert_eq!(path, PathBuf::from(format!("C:{sep}Users{sep}me{sep}Saves")));
    }

    #[test]
    fn normalises_forward_slashes() {
        let sep = MAIN_SEPARATOR;
        let path = sanitize_directory("'/home/me/Timberborn/Saves/Colony'");
        assert_eq!(
            path,
            PathBuf::from(format!("{sep}home{sep}me{sep}Timberborn{sep}Saves{sep}Colony"))
        );
    }
}
