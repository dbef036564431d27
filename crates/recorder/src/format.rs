use crate::entry::Entry;
use std::sync::atomic::{AtomicPtr, Ordering};

/// Ticks per second assumed for the default timestamp rendering. The clock
/// source is nanosecond-granularity (`clock.rs`), so this is fixed rather
/// than configurable.
const TICKS_PER_SECOND: u64 = 1_000_000_000;

/// Formats one entry's message body (the part after resolving `%`
/// conversions against `entry.args`).
///
/// Returns `None` if the format string contains `%n`, `%*`, or an
/// unrecognised conversion, per the "abort formatting of this entry" rule.
pub fn format_message(entry: &Entry) -> Option<String> {
    let mut out = String::with_capacity(entry.format.len() + 16);
    let mut chars = entry.format.chars().peekable();
    let mut arg_index = 0usize;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('%') => {
                chars.next();
                out.push('%');
                continue;
            }
            None => {
                // Trailing lone `%`: not a recognised conversion.
                return None;
            }
            _ => {}
        }

        // Collect flags/width/precision verbatim up to the conversion
        // character; we only need to classify the final specifier.
        let mut spec = String::from("%");
        let mut conv = None;
        for next in chars.by_ref() {
            spec.push(next);
            if next.is_ascii_alphabetic() {
                conv = Some(next);
                break;
            }
        }
        let Some(conv) = conv else {
            return None;
        };

        if arg_index >= entry.arg_count as usize {
            // A format specifier referencing more than K arguments
            // truncates at K.
            break;
        }
        let raw = entry.args[arg_index];
        arg_index += 1;

        match conv {
            'n' | '*' => return None,
            'd' | 'D' | 'i' | 'b' | 'o' | 'O' => {
                out.push_str(&(raw as i64).to_string());
            }
            'u' | 'U' => {
                out.push_str(&raw.to_string());
            }
            'x' => out.push_str(&format!("{:x}", raw)),
            'X' => out.push_str(&format!("{:X}", raw)),
            'c' | 'C' => {
                if let Some(ch) = char::from_u32(raw as u32) {
                    out.push(ch);
                }
            }
            's' | 'S' => {
                if raw == 0 {
                    out.push_str("<NULL>");
                } else {
                    // SAFETY-free path: string arguments are not C
                    // pointers here, so a non-null slot is
                    // rendered as its raw value; callers that need string
                    // interpolation should format the string into the
                    // format text at the call site.
                    out.push_str(&raw.to_string());
                }
            }
            'p' => out.push_str(&format!("{:#x}", raw)),
            'f' | 'F' | 'g' | 'G' | 'e' | 'E' | 'a' | 'A' => {
                let precision = extract_precision(&spec);
                let value = recover_float(raw);
                match precision {
                    Some(p) => out.push_str(&format!("{:.*}", p, value)),
                    None => out.push_str(&format!("{}", value)),
                }
            }
            _ => return None,
        }
    }

    if !out.ends_with('\n') {
        out.push('\n');
    }
    Some(out)
}

/// Recovers a floating-point value from a raw argument slot.
///
/// The slot is always stored as a 64-bit word, so recovery is always via
/// `f64::from_bits`; there is no narrower-width case to handle because
/// `args` are fixed at `u64`.
fn recover_float(raw: u64) -> f64 {
    f64::from_bits(raw)
}

/// Extracts a `%.<N>` precision out of a collected specifier like `%.2f`.
fn extract_precision(spec: &str) -> Option<usize> {
    let dot = spec.find('.')?;
    let rest = &spec[dot + 1..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Renders one complete output line for `entry`, emitted by `recorder_name`,
/// in the default layout:
/// `"<location>: [<order> <secs.fffffff>] <label>: <message>"`.
pub fn default_render(recorder_name: &str, entry: &Entry) -> Option<String> {
    let message = format_message(entry)?;
    let secs = entry.timestamp / TICKS_PER_SECOND;
    let frac_ticks = entry.timestamp % TICKS_PER_SECOND;
    let frac_micros = frac_ticks / 1_000;
    Some(format!(
        "{location}: [{order} {secs}.{frac_micros:06}] {label}: {message}",
        location = entry.location,
        order = entry.order,
        secs = secs,
        frac_micros = frac_micros,
        label = recorder_name,
        message = message.trim_end_matches('\n'),
    ) + "\n")
}

/// A pluggable whole-entry formatter, installed via the
/// `configure_format(fn)` hook. Given a recorder label and entry, produces
/// the full line to hand to the sink (or `None` to abort/skip this entry).
pub trait Formatter: Send + Sync {
    fn format(&self, recorder_name: &str, entry: &Entry) -> Option<String>;
}

struct DefaultFormatter;

impl Formatter for DefaultFormatter {
    fn format(&self, recorder_name: &str, entry: &Entry) -> Option<String> {
        default_render(recorder_name, entry)
    }
}

static DEFAULT_FORMATTER: DefaultFormatter = DefaultFormatter;
static DEFAULT_FORMATTER_REF: &'static dyn Formatter = &DEFAULT_FORMATTER;

/// The installed formatter, stored the same lock-free way as `sink.rs`'s
/// `CURRENT_SINK`: a pointer to a leaked `&'static dyn Formatter`, swapped
/// via CAS. `render` runs on the emit hot path and must stay callable from
/// a signal handler, so it can never block on a lock that an interrupted
/// thread might already be holding.
static CURRENT_FORMATTER: AtomicPtr<&'static dyn Formatter> = AtomicPtr::new(
    &DEFAULT_FORMATTER_REF as *const &'static dyn Formatter as *mut &'static dyn Formatter,
);

/// Installs a new formatter, returning the previous one. The replaced slot
/// is leaked rather than freed, since calls to `render` may already be
/// mid-flight holding the old pointer.
pub fn configure_format(formatter: &'static dyn Formatter) -> &'static dyn Formatter {
    let leaked: &'static mut &'static dyn Formatter = Box::leak(Box::new(formatter));
    let previous = CURRENT_FORMATTER.swap(leaked as *mut &'static dyn Formatter, Ordering::AcqRel);
    // SAFETY: every pointer ever stored here points at either
    // `DEFAULT_FORMATTER_REF` or a `Box::leak`ed slot, both of which live
    // for the process lifetime.
    unsafe { *previous }
}

/// Formats `entry` (emitted by `recorder_name`) using the currently
/// configured formatter.
pub fn render(recorder_name: &str, entry: &Entry) -> Option<String> {
    let ptr = CURRENT_FORMATTER.load(Ordering::Acquire);
    // SAFETY: see `configure_format`.
    let formatter = unsafe { *ptr };
    formatter.format(recorder_name, entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with(format: &'static str, args: &[u64]) -> Entry {
        Entry::new(0, 1, "test.rs:1", format, args)
    }

    #[test]
    fn simple_integer_formatting() {
        let e = entry_with("%d", &[42]);
        assert_eq!(format_message(&e).unwrap(), "42\n");
    }

    #[test]
    fn percent_literal() {
        let e = entry_with("100%%", &[]);
        assert_eq!(format_message(&e).unwrap(), "100%\n");
    }

    #[test]
    fn null_string_slot_renders_null() {
        let e = entry_with("%s", &[0]);
        assert_eq!(format_message(&e).unwrap(), "<NULL>\n");
    }

    #[test]
    fn float_recovery_with_precision() {
        let e = entry_with("%.2f", &[1.5f64.to_bits()]);
        assert_eq!(format_message(&e).unwrap(), "1.50\n");
    }

    #[test]
    fn percent_n_aborts() {
        let e = entry_with("%n", &[1]);
        assert!(format_message(&e).is_none());
    }

    #[test]
    fn truncates_at_k_arguments() {
        let e = entry_with("%d %d %d %d %d", &[1, 2, 3, 4]);
        let msg = format_message(&e).unwrap();
        assert_eq!(msg, "1 2 3 4 \n");
    }

    #[test]
    fn trailing_newline_not_duplicated() {
        let e = entry_with("hi\n", &[]);
        assert_eq!(format_message(&e).unwrap(), "hi\n");
    }

    struct UpperCaseFormatter;

    impl Formatter for UpperCaseFormatter {
        fn format(&self, recorder_name: &str, entry: &Entry) -> Option<String> {
            default_render(recorder_name, entry).map(|line| line.to_uppercase())
        }
    }

    #[test]
    fn configure_format_installs_and_restores_formatter() {
        static UPPER: UpperCaseFormatter = UpperCaseFormatter;
        let e = entry_with("hello", &[]);
        let previous = configure_format(&UPPER);
        let line = render("test.recorder", &e).unwrap();
        assert_eq!(line, line.to_uppercase());
        configure_format(previous);
    }
}
