//! Conversion between the local rich text of heading bodies and JIRA wiki
//! markup.
//!
//! | local                    | jira                |
//! |--------------------------|---------------------|
//! | `*bold*`                 | `*bold*`            |
//! | `/italic/`               | `_italic_`          |
//! | `_underline_`            | `+underline+`       |
//! | `+strike+`               | `-strike-`          |
//! | `=code=`, `~code~`       | `{{code}}`          |
//! | `[[url][desc]]`          | `[desc\|url]`       |
//! | `- item` (2 space nest)  | `* item`, `** item` |
//! | `1. item`                | `# item`            |
//! | `* Title` (subheading)   | `h1. Title`         |
//! | `#+begin_src lang`       | `{code:lang}`       |
//! | `#+begin_quote`          | `{quote}`           |
//! | `#+begin_example`        | `{noformat}`        |

use std::sync::OnceLock;

use regex::{Captures, Regex};

struct Patterns {
  local_code: Regex,
  local_link: Regex,
  local_bare_link: Regex,
  local_strike: Regex,
  local_underline: Regex,
  local_italic: Regex,
  local_heading: Regex,
  local_bullet: Regex,
  local_numbered: Regex,
  jira_code: Regex,
  jira_link: Regex,
  jira_bare_link: Regex,
  jira_italic: Regex,
  jira_underline: Regex,
  jira_strike: Regex,
  jira_heading: Regex,
  jira_bullet: Regex,
  jira_numbered: Regex,
  jira_code_block: Regex,
}

/// Emphasis delimited by `d`, bounded by whitespace or punctuation.
fn emphasis(d: &str) -> Regex {
  let d = regex::escape(d);
  Regex::new(&format!(
    r"(^|[\s(])(?:{d})([^\s{d}](?:[^{d}]*[^\s{d}])?)(?:{d})($|[\s.,;:!?)])"
  ))
  .expect("emphasis pattern")
}

fn patterns() -> &'static Patterns {
  static PATTERNS: OnceLock<Patterns> = OnceLock::new();
  PATTERNS.get_or_init(|| Patterns {
    local_code: Regex::new(r"(^|[\s(])[=~]([^\s=~](?:[^=~]*[^\s=~])?)[=~]").expect("code"),
    local_link: Regex::new(r"\[\[([^\]]+)\]\[([^\]]+)\]\]").expect("link"),
    local_bare_link: Regex::new(r"\[\[([^\]]+)\]\]").expect("bare link"),
    local_strike: emphasis("+"),
    local_underline: emphasis("_"),
    local_italic: emphasis("/"),
    local_heading: Regex::new(r"^(\*+) (.*)$").expect("heading"),
    local_bullet: Regex::new(r"^(\s*)[-+] (.*)$").expect("bullet"),
    local_numbered: Regex::new(r"^(\s*)\d+[.)] (.*)$").expect("numbered"),
    jira_code: Regex::new(r"\{\{(.+?)\}\}").expect("code"),
    jira_link: Regex::new(r"\[([^\]|]+)\|([^\]]+)\]").expect("link"),
    jira_bare_link: Regex::new(r"\[((?:https?|ftp|mailto|file):[^\]|]+)\]").expect("bare link"),
    jira_italic: emphasis("_"),
    jira_underline: emphasis("+"),
    jira_strike: emphasis("-"),
    jira_heading: Regex::new(r"^h([1-6])\. (.*)$").expect("heading"),
    jira_bullet: Regex::new(r"^(\*+) (.*)$").expect("bullet"),
    jira_numbered: Regex::new(r"^(#+) (.*)$").expect("numbered"),
    jira_code_block: Regex::new(r"^\{code(?::([^}]*))?\}$").expect("code block"),
  })
}

fn replace_emphasis(re: &Regex, text: &str, open: &str, close: &str) -> String {
  re.replace_all(text, |c: &Captures| {
    format!("{}{open}{}{close}{}", &c[1], &c[2], &c[3])
  })
  .into_owned()
}

/// Applies `f` to the text between inline code spans, converting the spans
/// with `code`.
fn outside_code(
  re: &Regex,
  text: &str,
  code: impl Fn(&Captures) -> String,
  f: impl Fn(&str) -> String,
) -> String {
  let mut out = String::new();
  let mut last = 0;
  for caps in re.captures_iter(text) {
    let m = caps.get(0).expect("whole match");
    out.push_str(&f(&text[last..m.start()]));
    out.push_str(&code(&caps));
    last = m.end();
  }
  out.push_str(&f(&text[last..]));
  out
}

fn inline_to_jira(text: &str) -> String {
  let p = patterns();
  outside_code(
    &p.local_code,
    text,
    |c| format!("{}{{{{{}}}}}", &c[1], &c[2]),
    |s| {
      let s = p.local_link.replace_all(s, "[$2|$1]");
      let s = p.local_bare_link.replace_all(&s, "[$1]");
      let s = replace_emphasis(&p.local_strike, &s, "-", "-");
      let s = replace_emphasis(&p.local_underline, &s, "+", "+");
      replace_emphasis(&p.local_italic, &s, "_", "_")
    },
  )
}

fn inline_from_jira(text: &str) -> String {
  let p = patterns();
  outside_code(
    &p.jira_code,
    text,
    |c| format!("={}=", &c[1]),
    |s| {
      let s = p.jira_bare_link.replace_all(s, "[[$1]]");
      let s = p.jira_link.replace_all(&s, "[[$2][$1]]");
      let s = replace_emphasis(&p.jira_italic, &s, "/", "/");
      let s = replace_emphasis(&p.jira_underline, &s, "_", "_");
      replace_emphasis(&p.jira_strike, &s, "+", "+")
    },
  )
}

#[derive(PartialEq)]
enum Block {
  None,
  Src,
  Example,
}

/// Local rich text to JIRA wiki markup.
pub fn to_jira(local: &str) -> String {
  let p = patterns();
  let mut block = Block::None;
  let mut out = Vec::new();

  for line in local.lines() {
    let directive = line.trim().to_lowercase();

    if block != Block::None {
      match (&block, directive.as_str()) {
        (Block::Src, "#+end_src") => {
          out.push("{code}".to_string());
          block = Block::None;
        }
        (Block::Example, "#+end_example") => {
          out.push("{noformat}".to_string());
          block = Block::None;
        }
        _ => out.push(line.to_string()),
      }
      continue;
    }

    if let Some(rest) = directive.strip_prefix("#+begin_src") {
      let lang = rest.split_whitespace().next();
      out.push(match lang {
        Some(lang) => format!("{{code:{lang}}}"),
        None => "{code}".to_string(),
      });
      block = Block::Src;
    } else if directive == "#+begin_example" {
      out.push("{noformat}".to_string());
      block = Block::Example;
    } else if directive == "#+begin_quote" || directive == "#+end_quote" {
      out.push("{quote}".to_string());
    } else if let Some(c) = p.local_heading.captures(line) {
      let level = c[1].len().min(6);
      out.push(format!("h{level}. {}", inline_to_jira(&c[2])));
    } else if let Some(c) = p.local_bullet.captures(line) {
      let depth = c[1].len() / 2 + 1;
      out.push(format!("{} {}", "*".repeat(depth), inline_to_jira(&c[2])));
    } else if let Some(c) = p.local_numbered.captures(line) {
      let depth = c[1].len() / 2 + 1;
      out.push(format!("{} {}", "#".repeat(depth), inline_to_jira(&c[2])));
    } else {
      out.push(inline_to_jira(line));
    }
  }

  out.join("\n")
}

/// JIRA wiki markup to local rich text.
pub fn from_jira(jira: &str) -> String {
  let p = patterns();
  let text = jira.replace("\r\n", "\n");
  let mut block = Block::None;
  let mut in_quote = false;
  let mut counters: Vec<usize> = Vec::new();
  let mut out = Vec::new();

  for line in text.lines() {
    let trimmed = line.trim();

    if block != Block::None {
      match (&block, trimmed) {
        (Block::Src, "{code}") => {
          out.push("#+end_src".to_string());
          block = Block::None;
        }
        (Block::Example, "{noformat}") => {
          out.push("#+end_example".to_string());
          block = Block::None;
        }
        _ => out.push(line.to_string()),
      }
      continue;
    }

    if !p.jira_numbered.is_match(line) {
      counters.clear();
    }

    if let Some(c) = p.jira_code_block.captures(trimmed) {
      out.push(match c.get(1) {
        Some(lang) => format!("#+begin_src {}", lang.as_str()),
        None => "#+begin_src".to_string(),
      });
      block = Block::Src;
    } else if trimmed == "{noformat}" {
      out.push("#+begin_example".to_string());
      block = Block::Example;
    } else if trimmed == "{quote}" {
      out.push(if in_quote { "#+end_quote" } else { "#+begin_quote" }.to_string());
      in_quote = !in_quote;
    } else if let Some(c) = p.jira_heading.captures(line) {
      let level: usize = c[1].parse().unwrap_or(1);
      out.push(format!("{} {}", "*".repeat(level), inline_from_jira(&c[2])));
    } else if let Some(c) = p.jira_bullet.captures(line) {
      let indent = "  ".repeat(c[1].len() - 1);
      out.push(format!("{indent}- {}", inline_from_jira(&c[2])));
    } else if let Some(c) = p.jira_numbered.captures(line) {
      let depth = c[1].len();
      counters.resize(depth, 0);
      counters[depth - 1] += 1;
      let indent = "  ".repeat(depth - 1);
      out.push(format!("{indent}{}. {}", counters[depth - 1], inline_from_jira(&c[2])));
    } else {
      out.push(inline_from_jira(line));
    }
  }

  out.join("\n")
}
