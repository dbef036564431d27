use crate::consts::MAX_ARGS;
use crate::error::{ConfigError, TraceSetOutcome};
use crate::global_share;
use crate::recorder::{self, Recorder, TRACE_EXPORTED_ONLY};
use crate::tweak;
use regex::RegexBuilder;

/// Default capacity of a channel created by the string-form export
/// directive: a round power of two comfortably larger than typical
/// poll intervals.
const EXPORT_CHANNEL_CAPACITY: u32 = 1024;

/// Applies a trace/tweak configuration string: a colon-or-space-separated
/// list of directives. Invalid directives are reported but
/// do not abort the remaining ones; the overall outcome reflects the first
/// error encountered, if any.
pub fn trace_set(config: &str) -> TraceSetOutcome {
    let mut outcome = TraceSetOutcome::Ok;
    for directive in config.split([':', ' ']).filter(|d| !d.is_empty()) {
        if let Err(err) = apply_directive(directive) {
            if outcome == TraceSetOutcome::Ok {
                outcome = err.outcome();
            }
        }
    }
    outcome
}

fn apply_directive(directive: &str) -> Result<(), ConfigError> {
    if directive.eq_ignore_ascii_case("help") || directive.eq_ignore_ascii_case("list") {
        print_help();
        return Ok(());
    }

    if let Some(path) = directive.strip_prefix("share=") {
        return global_share::reopen(path).map_err(|_| ConfigError::InvalidValue {
            directive: directive.to_string(),
        });
    }

    let (name_part, rhs) = match directive.split_once('=') {
        Some((n, v)) => (n, Some(v)),
        None => (directive, None),
    };

    let pattern = if name_part.eq_ignore_ascii_case("all") {
        ".*".to_string()
    } else {
        name_part.to_string()
    };

    let re = RegexBuilder::new(&format!("^(?:{})$", pattern))
        .case_insensitive(true)
        .build()
        .map_err(|source| ConfigError::InvalidName {
            name: name_part.to_string(),
            source,
        })?;

    match rhs {
        None => {
            apply_numeric(&re, 1);
            Ok(())
        }
        Some(value) => {
            if let Some(n) = parse_integer(value) {
                apply_numeric(&re, n);
                Ok(())
            } else {
                apply_string_export(directive, &re, value)
            }
        }
    }
}

fn apply_numeric(re: &regex::Regex, value: i64) {
    for rec in recorder::recorders() {
        if re.is_match(rec.name) {
            rec.set_trace(value);
        }
    }
    for tw in tweak::tweaks() {
        if re.is_match(tw.name) {
            tw.set(value);
        }
    }
}

fn apply_string_export(directive: &str, re: &regex::Regex, rhs: &str) -> Result<(), ConfigError> {
    let names: Vec<&str> = rhs.split(',').take(MAX_ARGS).collect();
    let matching: Vec<&'static Recorder> = recorder::recorders().filter(|r| re.is_match(r.name)).collect();
    let disambiguate = matching.len() > 1;
    let invalid = || ConfigError::InvalidValue {
        directive: directive.to_string(),
    };

    let result = global_share::with_global(|set| -> Result<(), ConfigError> {
        for rec in &matching {
            for (i, export_name) in names.iter().enumerate() {
                let full_name = if disambiguate {
                    format!("{}/{}", rec.name, export_name)
                } else {
                    (*export_name).to_string()
                };
                let channel = set.new_channel(&full_name, "", "", EXPORT_CHANNEL_CAPACITY).map_err(|_| invalid())?;
                let leaked: &'static _ = Box::leak(Box::new(channel));
                rec.set_exported(i, leaked);
            }
            if rec.trace() == 0 {
                rec.set_trace(TRACE_EXPORTED_ONLY);
            }
        }
        Ok(())
    });

    match result {
        Ok(inner) => inner,
        Err(_) => Err(invalid()),
    }
}

/// Parses a `strtol`-style integer: optional sign, `0x`/`0X` hex, leading
/// `0` octal, else decimal. Returns `None` on empty input or trailing
/// garbage after the numeric part.
fn parse_integer(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (sign, rest) = match s.strip_prefix('-') {
        Some(r) => (-1i64, r),
        None => (1i64, s.strip_prefix('+').unwrap_or(s)),
    };
    let (radix, digits) = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (16, hex)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };
    if digits.is_empty() {
        return None;
    }
    i64::from_str_radix(digits, radix).ok().map(|v| sign * v)
}

fn print_help() {
    let mut out = String::new();
    out.push_str("recorders:\n");
    for rec in recorder::recorders() {
        out.push_str(&format!("  {} = {} ({})\n", rec.name, rec.trace(), rec.description));
    }
    out.push_str("tweaks:\n");
    for tw in tweak::tweaks() {
        out.push_str(&format!("  {} = {} ({})\n", tw.name, tw.get(), tw.description));
    }
    crate::sink::show(out.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_hex_octal() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("0x2a"), Some(42));
        assert_eq!(parse_integer("052"), Some(42));
        assert_eq!(parse_integer("-7"), Some(-7));
    }

    #[test]
    fn trailing_garbage_is_invalid() {
        assert_eq!(parse_integer("42abc"), None);
    }

    #[test]
    fn repeated_trace_set_is_idempotent() {
        let rec = recorder::register_recorder(Recorder::new("config.idempotent", "d", 16));
        let outcome1 = trace_set("config\\.idempotent=3");
        let outcome2 = trace_set("config\\.idempotent=3");
        assert_eq!(outcome1, TraceSetOutcome::Ok);
        assert_eq!(outcome2, TraceSetOutcome::Ok);
        assert_eq!(rec.trace(), 3);
    }

    #[test]
    fn invalid_regex_reports_invalid_name() {
        let outcome = trace_set("[unclosed=1");
        assert_eq!(outcome, TraceSetOutcome::InvalidName);
    }
}
