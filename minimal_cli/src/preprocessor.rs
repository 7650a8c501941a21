//! Line-oriented preprocessing pass: trims whitespace, strips comments
//! through unchanged, and splits each non-comment line on `;` so every
//! logical statement gets exactly one trailing semicolon delimiter.
//!
//! Grounded directly in `preprocessor.c`'s `preprocess`/`trim_string`/
//! `is_comment`/`should_add_semicolon`.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::MinimalError;

pub const MAX_LINE_LENGTH: usize = 100;
const NO_SEMICOLON_AFTER: &[char] = &[':', '?', '#', '@', '$'];
const BLOCK_SENTINELS: &[&str] = &["<<<", "{{{", "!~>..<~!"];
const SOURCE_EXTENSION: &str = "mini";

fn is_comment(line: &str) -> bool {
    line.starts_with("//")
}

fn should_add_semicolon(fragment: &str) -> bool {
    if BLOCK_SENTINELS.contains(&fragment) {
        return false;
    }
    match fragment.chars().last() {
        Some(last) => !NO_SEMICOLON_AFTER.contains(&last),
        None => true,
    }
}

/// The default output path when the CLI wasn't given an explicit `-o`: the
/// main file's extension swapped for `prep`.
pub fn default_output_path(main_file: &Path) -> PathBuf {
    main_file.with_extension("prep")
}

/// Preprocesses every input file in order and writes the concatenated,
/// delimiter-normalized result to `output`. Returns that same text so the
/// lexer can consume it in memory without a second read of `output`.
pub fn preprocess(
    inputs: &[PathBuf],
    output: &Path,
    verbose: bool,
) -> Result<String, MinimalError> {
    if verbose {
        info!("beginning preprocessing");
    }

    for path in inputs {
        let has_mini_extension = path.extension().and_then(|ext| ext.to_str()) == Some(SOURCE_EXTENSION);
        if !has_mini_extension {
            return Err(MinimalError::InvalidArgument(format!(
                "source file {} doesn't have the correct extension '.{SOURCE_EXTENSION}'",
                path.display()
            )));
        }
    }

    let mut out = String::new();

    for path in inputs {
        if verbose {
            info!("current file: {}", path.display());
        }

        let contents = fs::read_to_string(path)
            .map_err(|_| MinimalError::FileNotFound(path.display().to_string()))?;

        let mut line_count = 0usize;
        for (idx, raw_line) in contents.lines().enumerate() {
            if raw_line.len() > MAX_LINE_LENGTH {
                return Err(MinimalError::LineTooLong {
                    file: path.display().to_string(),
                    line: idx + 1,
                    max: MAX_LINE_LENGTH,
                });
            }
            let trimmed = raw_line.trim();
            line_count += 1;

            if is_comment(trimmed) {
                out.push_str(trimmed);
                out.push('\n');
                continue;
            }

            for fragment in trimmed.split(';') {
                let fragment = fragment.trim();
                if fragment.is_empty() {
                    continue;
                }

                if should_add_semicolon(fragment) {
                    if fragment.len() == MAX_LINE_LENGTH {
                        return Err(MinimalError::CantAddDelimiter {
                            file: path.display().to_string(),
                            line: idx + 1,
                        });
                    }
                    out.push_str(fragment);
                    out.push_str(";\n");
                } else {
                    out.push_str(fragment);
                    out.push('\n');
                }
            }
        }

        if line_count == 0 {
            return Err(MinimalError::FileEmpty(path.display().to_string()));
        }
    }

    fs::write(output, &out)?;
    if verbose {
        info!("output file: {}", output.display());
        info!("preprocessing complete");
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("minimal_cli_test_{}_{name}", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn adds_semicolons_and_splits_fragments() {
        let input = write_temp("basic.mini", "x := 1 ; y := 2\n// a comment\n");
        let output = input.with_extension("prep");
        let result = preprocess(&[input.clone()], &output, false).unwrap();
        assert!(result.contains("x := 1;\n"));
        assert!(result.contains("y := 2;\n"));
        assert!(result.contains("// a comment\n"));
        fs::remove_file(&input).unwrap();
        fs::remove_file(&output).unwrap();
    }

    #[test]
    fn does_not_add_semicolon_after_no_semicolon_chars() {
        let input = write_temp("nosemi.mini", "loop_block@@\n");
        let output = input.with_extension("prep");
        let result = preprocess(&[input.clone()], &output, false).unwrap();
        assert!(result.ends_with("loop_block@@\n"));
        fs::remove_file(&input).unwrap();
        fs::remove_file(&output).unwrap();
    }

    #[test]
    fn rejects_wrong_extension() {
        let input = write_temp("oops.txt", "x := 1\n");
        let output = input.with_extension("prep");
        let err = preprocess(&[input.clone()], &output, false).unwrap_err();
        assert!(matches!(err, MinimalError::InvalidArgument(_)));
        fs::remove_file(&input).unwrap();
    }

    #[test]
    fn rejects_empty_file() {
        let input = write_temp("empty.mini", "");
        let output = input.with_extension("prep");
        let err = preprocess(&[input.clone()], &output, false).unwrap_err();
        assert!(matches!(err, MinimalError::FileEmpty(_)));
        fs::remove_file(&input).unwrap();
    }
}
