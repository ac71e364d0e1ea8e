//! Suite selector derivation
//!
//! A targeted run restricts the in-browser filter to one block of a spec
//! file. The filter string is recovered from the file's source text: the
//! `describe`/`it` nesting enclosing a requested line, or the first
//! `describe` title when no line was given. Both JavaScript and
//! CoffeeScript declaration styles are recognized.

use std::fs;

use regex::Regex;

use crate::target::Target;

/// Derive the suite filter for a target. `None` means "no filter", i.e.
/// run the full suite at the base URL.
pub fn for_target(target: &Target) -> Option<String> {
    let source = fs::read_to_string(&target.path).ok()?;
    match target.line {
        Some(line) => from_line(&source, line),
        None => first_describe(&source),
    }
}

struct Declaration {
    indent: usize,
    is_it: bool,
    title: String,
}

fn declarations(source: &str, up_to_line: usize) -> Vec<Declaration> {
    let decl = match Regex::new(r"^(\s*)(it|describe)\b") {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    let title = match Regex::new(r#"["']([^"']*)["']"#) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    source
        .lines()
        .take(up_to_line)
        .filter_map(|text| {
            let caps = decl.captures(text)?;
            let quoted = title.captures(text)?;
            Some(Declaration {
                indent: caps[1].len(),
                is_it: &caps[2] == "it",
                title: quoted[1].to_string(),
            })
        })
        .collect()
}

/// Selector for a line-targeted run: the deepest declaration at or above
/// the line, prefixed by each enclosing block. Walking upward, a line
/// only counts as enclosing when its indentation is strictly less than
/// every declaration kept below it; `it` ancestors are dropped from the
/// title even when they gate the indentation chain.
fn from_line(source: &str, line: u32) -> Option<String> {
    let mut found = declarations(source, line as usize);
    let deepest = found.pop()?;

    let mut level = deepest.indent;
    let mut titles = vec![deepest.title];
    for decl in found.into_iter().rev() {
        if decl.indent < level {
            level = decl.indent;
            if !decl.is_it {
                titles.push(decl.title);
            }
        }
    }

    titles.reverse();
    Some(titles.join(" "))
}

/// Selector for a whole-file run: the first `describe` title in the file.
fn first_describe(source: &str) -> Option<String> {
    let re = Regex::new(r#"^\s*describe\b.*?["']([^"']*)["']"#).ok()?;
    source
        .lines()
        .find_map(|text| re.captures(text).map(|caps| caps[1].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COFFEE: &str = "\
describe 'Outer', ->

  describe 'Middle', ->

    it 'does the deep thing', ->
      expect(1).toBe 1

  it 'does the shallow thing', ->
    expect(2).toBe 2
";

    #[test]
    fn test_first_describe_title() {
        assert_eq!(first_describe(COFFEE), Some("Outer".to_string()));
        assert_eq!(first_describe("// nothing here\n"), None);
    }

    #[test]
    fn test_line_inside_nested_block() {
        assert_eq!(
            from_line(COFFEE, 5),
            Some("Outer Middle does the deep thing".to_string())
        );
    }

    #[test]
    fn test_line_skips_sibling_it_blocks() {
        let source = "\
describe 'Outer', ->

  it 'inner', ->

  it 'target', ->
";
        // Line 5 is the second `it`; the first sits at the same depth so
        // it is no ancestor, and `it` lines never contribute titles.
        assert_eq!(from_line(source, 5), Some("Outer target".to_string()));
    }

    #[test]
    fn test_line_on_describe_names_only_that_chain() {
        assert_eq!(from_line(COFFEE, 3), Some("Outer Middle".to_string()));
    }

    #[test]
    fn test_line_before_any_declaration() {
        assert_eq!(from_line("// header\n\ndescribe 'X', ->\n", 2), None);
    }

    #[test]
    fn test_javascript_style_declarations() {
        let source = "\
describe(\"Calculator\", function() {
  it(\"adds\", function() {
    expect(add(1, 1)).toBe(2);
  });
});
";
        assert_eq!(from_line(source, 2), Some("Calculator adds".to_string()));
        assert_eq!(first_describe(source), Some("Calculator".to_string()));
    }
}
