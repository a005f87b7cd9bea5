//! Quote-aware bash command classification.
//!
//! A command line is split into pipe/sequence subcommands, and every
//! subcommand must pass the read-only allowlist for the whole line to be
//! allowed. Separators inside quotes do not split; backtick subshells and
//! `$(...)` are treated as opaque text. Destructive patterns override the
//! allowlist: an allowlisted `find` with `-delete` is still blocked.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Allowlist;

/// Classification result for one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Blocked { reason: String },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Allowed => None,
            Verdict::Blocked { reason } => Some(reason),
        }
    }
}

/// Commands that mutate the filesystem regardless of arguments.
const DESTRUCTIVE_COMMANDS: [&str; 5] = ["rm", "mv", "cp", "mkdir", "touch"];

/// Two-word git operations that rewrite history or publish.
const DESTRUCTIVE_GIT: [&str; 3] = ["git commit", "git push", "git merge"];

/// Package managers whose install-ish verbs mutate the environment.
const PACKAGE_MANAGERS: [&str; 13] = [
    "npm", "yarn", "pnpm", "pip", "pip3", "cargo", "apt", "apt-get", "brew", "gem", "poetry",
    "uv", "conda",
];

const INSTALL_VERBS: [&str; 6] = ["install", "add", "remove", "uninstall", "update", "upgrade"];

static DELETE_FLAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|\s)-delete(\s|$)").expect("valid -delete pattern"));

static EXEC_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|\s)-exec(dir)?\s+(\S+)").expect("valid -exec pattern"));

/// Classifies a shell command line against the configured allowlist.
pub fn classify(command: &str, allowlist: &Allowlist) -> Verdict {
    if command.trim().is_empty() {
        return Verdict::Allowed;
    }

    let subcommands = match split_subcommands(command) {
        Ok(subcommands) => subcommands,
        Err(UnparsableQuotes) => {
            return Verdict::Blocked {
                reason: "unparsable quotes".to_string(),
            }
        }
    };

    for subcommand in &subcommands {
        if let Some(reason) = check_subcommand(subcommand, allowlist) {
            return Verdict::Blocked { reason };
        }
    }

    Verdict::Allowed
}

/// One pipe/sequence segment plus what the scanner saw outside quotes.
#[derive(Debug, PartialEq, Eq)]
struct Subcommand {
    text: String,
    has_redirect: bool,
}

struct UnparsableQuotes;

/// Splits on `|`, `||`, `&&`, `;` outside quotes. Redirections are detected
/// here because only the scanner knows whether a `>` sits inside quotes.
fn split_subcommands(command: &str) -> Result<Vec<Subcommand>, UnparsableQuotes> {
    let mut subcommands = Vec::new();
    let mut current = String::new();
    let mut has_redirect = false;

    let mut in_single = false;
    let mut in_double = false;
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if !in_single => {
                // Escaped character: keep both, never a separator.
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(c);
            }
            '|' | ';' if !in_single && !in_double => {
                if c == '|' && chars.peek() == Some(&'|') {
                    chars.next();
                }
                subcommands.push(Subcommand {
                    text: std::mem::take(&mut current),
                    has_redirect: std::mem::take(&mut has_redirect),
                });
            }
            '&' if !in_single && !in_double && chars.peek() == Some(&'&') => {
                chars.next();
                subcommands.push(Subcommand {
                    text: std::mem::take(&mut current),
                    has_redirect: std::mem::take(&mut has_redirect),
                });
            }
            '>' if !in_single && !in_double => {
                has_redirect = true;
                current.push(c);
            }
            _ => current.push(c),
        }
    }

    if in_single || in_double {
        return Err(UnparsableQuotes);
    }

    subcommands.push(Subcommand {
        text: current,
        has_redirect,
    });
    Ok(subcommands)
}

/// Returns a block reason, or `None` when the subcommand is read-only.
fn check_subcommand(subcommand: &Subcommand, allowlist: &Allowlist) -> Option<String> {
    let text = subcommand.text.trim();
    if text.is_empty() {
        return None;
    }

    let mut words = text.split_whitespace();
    let first = words.next()?;
    let second = words.next();
    let two_word = second.map(|second| format!("{first} {second}"));

    // Destructive overrides come first: they beat the allowlist.
    if subcommand.has_redirect {
        return Some(format!("output redirection in `{text}`"));
    }
    if DELETE_FLAG.is_match(text) {
        return Some(format!("`-delete` flag in `{text}`"));
    }
    if let Some(captures) = EXEC_CLAUSE.captures(text) {
        let executed = captures.get(3).map_or("", |m| m.as_str());
        if is_destructive_word(executed) {
            return Some(format!("`-exec {executed}` in `{text}`"));
        }
    }
    if DESTRUCTIVE_COMMANDS.contains(&first) {
        return Some(format!("`{first}` is a mutating command"));
    }
    if let Some(two_word) = &two_word {
        if DESTRUCTIVE_GIT.contains(&two_word.as_str()) {
            return Some(format!("`{two_word}` mutates the repository"));
        }
        if PACKAGE_MANAGERS.contains(&first)
            && second.is_some_and(|verb| INSTALL_VERBS.contains(&verb))
        {
            return Some(format!("`{two_word}` modifies installed packages"));
        }
    }

    // Allowlist: single-word equality or two-word prefix equality.
    let allowed = allowlist.entries().any(|entry| {
        entry == first || two_word.as_deref() == Some(entry)
    });
    if allowed {
        return None;
    }

    Some(format!("`{first}` is not in the read-only allowlist"))
}

fn is_destructive_word(word: &str) -> bool {
    DESTRUCTIVE_COMMANDS.contains(&word) || word == "shred" || word == "unlink"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(command: &str) -> Verdict {
        classify(command, &Allowlist::default())
    }

    #[test]
    fn empty_and_whitespace_are_allowed() {
        assert!(verdict("").is_allowed());
        assert!(verdict("   \t ").is_allowed());
    }

    #[test]
    fn single_allowlisted_command_is_allowed() {
        assert!(verdict("ls -la").is_allowed());
        assert!(verdict("git status").is_allowed());
        assert!(verdict("grep -r pattern src/").is_allowed());
    }

    #[test]
    fn unknown_command_is_blocked() {
        let v = verdict("frobnicate --all");
        assert!(!v.is_allowed());
        assert!(v.reason().unwrap().contains("frobnicate"));
    }

    #[test]
    fn quoted_pipe_does_not_split() {
        // The pipe inside the quoted pattern is data, not a separator.
        assert!(verdict(r#"ls -la | grep -E "(task|script)""#).is_allowed());
    }

    #[test]
    fn unquoted_pipe_splits_and_each_side_is_checked() {
        assert!(verdict("ls | grep foo").is_allowed());
        let v = verdict("ls | rm foo");
        assert!(!v.is_allowed());
        assert!(v.reason().unwrap().contains("rm"));
    }

    #[test]
    fn and_or_semicolon_separators_split() {
        assert!(!verdict("ls && rm x").is_allowed());
        assert!(!verdict("ls || rm x").is_allowed());
        assert!(!verdict("ls; rm x").is_allowed());
        assert!(verdict("ls && pwd; git status").is_allowed());
    }

    #[test]
    fn unmatched_quote_is_blocked_as_unparsable() {
        let v = verdict("echo \"unterminated");
        assert_eq!(v.reason(), Some("unparsable quotes"));

        let v = verdict("echo 'also unterminated");
        assert_eq!(v.reason(), Some("unparsable quotes"));
    }

    #[test]
    fn delete_flag_blocks_allowlisted_find() {
        let v = verdict("find . -name '*.tmp' -delete");
        assert!(!v.is_allowed());
        assert!(v.reason().unwrap().contains("-delete"));
    }

    #[test]
    fn exec_with_destructive_command_blocks() {
        let v = verdict("find . -name '*.log' -exec rm {} \\;");
        assert!(!v.is_allowed());
        assert!(v.reason().unwrap().contains("-exec rm"));
    }

    #[test]
    fn exec_with_readonly_command_is_allowed() {
        assert!(verdict("find . -name '*.rs' -exec grep TODO {} \\;").is_allowed());
    }

    #[test]
    fn redirection_blocks() {
        assert!(!verdict("ls > files.txt").is_allowed());
        assert!(!verdict("cat a >> b").is_allowed());
    }

    #[test]
    fn quoted_redirect_character_does_not_block() {
        assert!(verdict(r#"grep ">" file.xml"#).is_allowed());
        assert!(verdict("echo '2 > 1'").is_allowed());
    }

    #[test]
    fn destructive_commands_block_even_bare() {
        for cmd in ["rm x", "mv a b", "cp a b", "mkdir d", "touch f"] {
            assert!(!verdict(cmd).is_allowed(), "{cmd} should be blocked");
        }
    }

    #[test]
    fn git_mutations_block_but_git_reads_pass() {
        assert!(!verdict("git commit -m x").is_allowed());
        assert!(!verdict("git push origin main").is_allowed());
        assert!(!verdict("git merge feature").is_allowed());
        assert!(verdict("git log --oneline").is_allowed());
        assert!(verdict("git diff HEAD~1").is_allowed());
    }

    #[test]
    fn package_install_verbs_block_while_queries_pass() {
        assert!(!verdict("npm install left-pad").is_allowed());
        assert!(!verdict("pip install requests").is_allowed());
        assert!(!verdict("cargo add serde").is_allowed());
        assert!(verdict("npm list").is_allowed());
        assert!(verdict("cargo tree").is_allowed());
    }

    #[test]
    fn quoting_a_destructive_pattern_does_not_change_the_verdict() {
        // `rm -rf` appears only as data inside quotes; the surrounding
        // command is still the one classified.
        assert!(verdict(r#"grep "rm -rf" script.sh"#).is_allowed());
        assert!(verdict(r#"echo 'never run rm -rf /'"#).is_allowed());
    }

    #[test]
    fn backticks_are_opaque_text() {
        // Subshells are not tokenized as separate subcommands. The backtick
        // body rides along with the enclosing command's verdict.
        assert!(verdict("echo `pwd`").is_allowed());
        let v = verdict("echo `pwd` > out.txt");
        assert!(!v.is_allowed());
    }

    #[test]
    fn custom_allowlist_section_is_honored() {
        let mut allowlist = Allowlist::default();
        allowlist.custom.push("terraform plan".to_string());

        assert!(classify("terraform plan", &allowlist).is_allowed());
        assert!(!classify("terraform apply", &allowlist).is_allowed());
    }

    #[test]
    fn blocked_reason_names_the_offending_subcommand() {
        let v = verdict("git status && npm install x");
        assert!(v.reason().unwrap().contains("npm install"));
    }

    #[test]
    fn escaped_separator_does_not_split() {
        assert!(verdict(r"grep foo\;bar file").is_allowed());
    }

    #[test]
    fn every_allowlist_entry_is_allowed_alone() {
        let allowlist = Allowlist::default();
        for entry in allowlist.entries() {
            assert!(
                classify(entry, &allowlist).is_allowed(),
                "allowlisted `{entry}` should pass on its own"
            );
        }
    }

    #[test]
    fn piping_any_allowlist_entry_into_a_destructive_command_blocks() {
        let allowlist = Allowlist::default();
        for entry in allowlist.entries() {
            let piped = format!("{entry} | rm -rf /tmp/x");
            assert!(
                !classify(&piped, &allowlist).is_allowed(),
                "`{piped}` should be blocked"
            );
        }
    }

    #[test]
    fn quoting_a_destructive_pattern_keeps_the_surrounding_verdict() {
        let allowlist = Allowlist::default();
        for entry in ["grep", "echo", "cat"] {
            let quoted = format!("{entry} \"rm -rf /\"");
            assert!(
                classify(&quoted, &allowlist).is_allowed(),
                "`{quoted}` should keep the allow verdict"
            );
        }
        // And quoting does not launder an actually destructive command.
        assert!(!classify("rm \"harmless looking\"", &allowlist).is_allowed());
    }
}
