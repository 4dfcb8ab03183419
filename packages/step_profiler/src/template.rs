//! Eager rendering of step names from positional templates.
//!
//! A template such as `"step {0} of {1}"` is combined with a slice of arguments exactly once,
//! when the step starts. The result is a plain `String` that the step keeps as its name.

use std::fmt::{Display, Write};
use std::iter::Peekable;
use std::str::Chars;

/// Renders `template` by replacing each `{N}` placeholder with the `Display` output of `args[N]`.
///
/// `{{` and `}}` produce literal braces. Anything that is not a well-formed placeholder
/// referring to an existing argument is copied through unchanged, so a malformed template
/// still yields a usable (if odd-looking) name.
///
/// # Examples
///
/// ```
/// use step_profiler::template::render;
///
/// assert_eq!(render("step {0} of {1}", &[&2, &"three"]), "step 2 of three");
/// assert_eq!(render("{{literal}}", &[]), "{literal}");
/// assert_eq!(render("missing {5}", &[&1]), "missing {5}");
/// ```
#[must_use]
pub fn render(template: &str, args: &[&dyn Display]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.next_if_eq(&'{').is_some() => result.push('{'),
            '}' if chars.next_if_eq(&'}').is_some() => result.push('}'),
            '{' => render_placeholder(&mut chars, args, &mut result),
            other => result.push(other),
        }
    }

    result
}

/// Handles the text after an opening `{`, either substituting an argument or restoring
/// the consumed characters verbatim.
fn render_placeholder(chars: &mut Peekable<Chars<'_>>, args: &[&dyn Display], out: &mut String) {
    let mut digits = String::new();

    while let Some(digit) = chars.next_if(char::is_ascii_digit) {
        digits.push(digit);
    }

    let closed = chars.next_if_eq(&'}').is_some();

    let arg = closed
        .then(|| digits.parse::<usize>().ok())
        .flatten()
        .and_then(|index| args.get(index));

    if let Some(arg) = arg {
        // Writing into a String cannot fail.
        _ = write!(out, "{arg}");
        return;
    }

    out.push('{');
    out.push_str(&digits);

    if closed {
        out.push('}');
    }
}
