use super::input::InputBuilder;
use super::Input;

pub const MENU_RETRY_MESSAGE: &str =
    "Invalid input, please retry with the digit corresponding to your selection";

/// Input answered with the digit of one option
///
/// The question is followed by the numbered options. The text of the chosen
/// option becomes the answer.
///
/// ```ignore
/// let lunch = menu("What would you like?", ["Hamburger", "Pizza"]).key("lunch").build()?;
/// ```
pub fn menu<I, S>(question: impl Into<String>, options: I) -> InputBuilder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let options: Vec<String> = options.into_iter().map(Into::into).collect();

    let mut lines = vec![question.into()];
    lines.extend(options.iter().enumerate().map(|(i, option)| format!("{}. {}", i + 1, option)));

    Input::builder(lines.join("\n"))
        .options(options)
        .on_retry(MENU_RETRY_MESSAGE)
        .prefix("menu")
}
