use tubepost_sessions::{PublishFormat, PublishOptions};

/// Parsed details message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingDetails {
    pub caption: String,
    pub publish: PublishOptions,
}

/// A details message that cannot move the flow forward. The user is asked to
/// correct it and the session stays where it is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetailsError {
    #[error("caption is missing")]
    MissingCaption,
    #[error("YouTube publishing is not enabled")]
    PublishNotEnabled,
    #[error("unknown YouTube format '{0}'")]
    UnknownFormat(String),
}

const CAPTION: &str = "caption:";
const YOUTUBE: &str = "youtube:";
const YOUTUBE_FORMAT: &str = "youtube format:";

/// Parse `Caption:`, `Youtube:` and `Youtube format:` lines.
///
/// Directive names are case-insensitive and may appear in any order; when a
/// directive repeats, the last one wins. Other lines are ignored. `Youtube`
/// is enabled by `yes`, `y` or `true`; the format defaults to shorts.
pub fn parse_details(text: &str) -> Result<PostingDetails, DetailsError> {
    let mut caption = String::new();
    let mut enabled = false;
    let mut format: Option<String> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(value) = directive(line, CAPTION) {
            caption = value.to_string();
        } else if let Some(value) = directive(line, YOUTUBE) {
            enabled = matches!(value.to_ascii_lowercase().as_str(), "yes" | "y" | "true");
        } else if let Some(value) = directive(line, YOUTUBE_FORMAT) {
            format = Some(value.to_string());
        }
    }

    if caption.is_empty() {
        return Err(DetailsError::MissingCaption);
    }
    if !enabled {
        return Err(DetailsError::PublishNotEnabled);
    }
    let format = match format.filter(|f| !f.is_empty()) {
        None => PublishFormat::default(),
        Some(raw) => raw
            .parse()
            .map_err(|_| DetailsError::UnknownFormat(raw.clone()))?,
    };

    Ok(PostingDetails {
        caption,
        publish: PublishOptions { enabled, format },
    })
}

/// Value after a case-insensitive `name:` prefix, trimmed.
fn directive<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let head = line.get(..name.len())?;
    head.eq_ignore_ascii_case(name)
        .then(|| line[name.len()..].trim())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest};

    fn shorts(caption: &str) -> PostingDetails {
        PostingDetails {
            caption: caption.into(),
            publish: PublishOptions {
                enabled: true,
                format: PublishFormat::Shorts,
            },
        }
    }

    #[test]
    fn full_message() {
        let parsed = parse_details("Caption: Hello\nYoutube: Yes\nYoutube format: shorts").unwrap();
        assert_eq!(parsed, shorts("Hello"));
    }

    #[test]
    fn every_line_order_gives_the_same_result() {
        let lines = ["Caption: Sunset run", "Youtube: yes", "Youtube format: video"];
        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        let expected = parse_details(&lines.join("\n")).unwrap();
        assert_eq!(expected.publish.format, PublishFormat::Video);
        for order in orders {
            let text = order.map(|i| lines[i]).join("\n");
            assert_eq!(parse_details(&text).unwrap(), expected, "order {order:?}");
            // and parsing is stable
            assert_eq!(parse_details(&text), parse_details(&text));
        }
    }

    #[rstest]
    #[case("yes")]
    #[case("Y")]
    #[case("TRUE")]
    fn truthy_youtube_values(#[case] value: &str) {
        let parsed = parse_details(&format!("caption: x\nyoutube: {value}")).unwrap();
        assert!(parsed.publish.enabled);
    }

    #[rstest]
    #[case("Caption: Hello")]
    #[case("Caption: Hello\nYoutube: No")]
    #[case("Caption: Hello\nYoutube: maybe")]
    fn publish_must_be_enabled(#[case] text: &str) {
        assert_eq!(parse_details(text), Err(DetailsError::PublishNotEnabled));
    }

    #[rstest]
    #[case("Youtube: Yes")]
    #[case("Caption:   \nYoutube: Yes")]
    #[case("just some words")]
    fn caption_is_required(#[case] text: &str) {
        assert_eq!(parse_details(text), Err(DetailsError::MissingCaption));
    }

    #[test]
    fn format_defaults_to_shorts() {
        let parsed = parse_details("CAPTION: Hi there\nYOUTUBE: yes").unwrap();
        assert_eq!(parsed, shorts("Hi there"));
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert_eq!(
            parse_details("Caption: a\nYoutube: yes\nYoutube format: reel"),
            Err(DetailsError::UnknownFormat("reel".into()))
        );
    }

    #[test]
    fn caption_keeps_case_and_inner_colons() {
        let parsed = parse_details("  Caption:  Part 2: The Return  \nYoutube: y").unwrap();
        assert_eq!(parsed.caption, "Part 2: The Return");
    }

    #[test]
    fn last_repeated_directive_wins() {
        let parsed = parse_details("Caption: one\nCaption: two\nYoutube: yes").unwrap();
        assert_eq!(parsed.caption, "two");
    }

    #[test]
    fn non_ascii_line_does_not_panic() {
        assert_eq!(
            parse_details("ça va\nCaption: ok\nYoutube: yes").unwrap().caption,
            "ok"
        );
    }
}
