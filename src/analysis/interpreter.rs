//! Heuristic interpreter for the free-text analysis returned by the model.
//!
//! The upstream response has no guaranteed schema; the prompt only asks for
//! `1. Item - N cal` style lines. Each classification rule lives behind its
//! own extractor so rules can be tested and reordered independently, and the
//! whole pass is total: any input, including garbage or an empty string,
//! yields a usable [`ParsedSummary`].

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{FoodItem, ParsedSummary};

/// Outcome of classifying a single trimmed line. First match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    NoMatch,
    FoodItem { name: String, calories: String },
    TotalCalories(String),
    HealthNote(String),
    Macronutrients(String),
    Recommendation(String),
}

fn numbered_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\d+\.\s+(.+?)\s*-\s*(\d+)\s*cal").expect("numbered item pattern")
    })
}

fn emphasis_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\*\*(.+?)\*\*\s*-\s*(\d+(?:-\d+)?)").expect("emphasis item pattern")
    })
}

fn labeled_total_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)total.*?calories?[\s:*]*(\d+(?:\s*-\s*\d+)?)").expect("total pattern")
    })
}

fn any_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\s*-\s*\d+)?)").expect("number pattern"))
}

fn numbered_list_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.").expect("list marker pattern"))
}

/// Strip `**`/`*` emphasis markup from a food name.
fn clean_name(raw: &str) -> String {
    raw.replace("**", "").replace('*', "").trim().to_string()
}

/// `"1260 - 1680"` and `"1260-1680"` should display the same way.
fn normalize_range(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Rule 1: `<index>. <name> - <integer> cal`, case-insensitive "cal".
fn match_numbered_item(line: &str) -> Option<LineClass> {
    numbered_item_re().captures(line).map(|caps| LineClass::FoodItem {
        name: clean_name(&caps[1]),
        calories: caps[2].to_string(),
    })
}

/// Rule 2: `**<name>** - <int or int-int>`, value or range kept verbatim.
fn match_emphasis_item(line: &str) -> Option<LineClass> {
    emphasis_item_re().captures(line).map(|caps| LineClass::FoodItem {
        name: caps[1].trim().to_string(),
        calories: caps[2].to_string(),
    })
}

/// Rule 3: a line talking about total calories. Prefers the number right
/// after the `total ... calories` label; falls back to the first number in
/// the line, which is a known weak spot when unrelated numbers share the
/// line with the keywords.
fn match_total_calories(line: &str) -> Option<LineClass> {
    let lower = line.to_lowercase();
    if !(lower.contains("total") && lower.contains("calorie")) {
        return None;
    }

    let captured = labeled_total_re()
        .captures(line)
        .or_else(|| any_number_re().captures(line))
        .map(|caps| normalize_range(&caps[1]));

    captured.map(LineClass::TotalCalories)
}

/// Rule 4: health commentary, kept whole for display.
fn match_health_note(line: &str) -> Option<LineClass> {
    let lower = line.to_lowercase();
    if lower.contains("healthy") || lower.contains("rating") {
        Some(LineClass::HealthNote(line.to_string()))
    } else {
        None
    }
}

/// Rule 5: macronutrient breakdown line.
fn match_macronutrients(line: &str) -> Option<LineClass> {
    let lower = line.to_lowercase();
    if lower.contains("carbohydrate") || lower.contains("protein") || lower.contains("fat") {
        Some(LineClass::Macronutrients(line.to_string()))
    } else {
        None
    }
}

/// Rule 6: any remaining prose long enough to be advice.
fn match_recommendation(line: &str) -> Option<LineClass> {
    if line.chars().count() > 20 && !numbered_list_marker_re().is_match(line) {
        Some(LineClass::Recommendation(line.to_string()))
    } else {
        None
    }
}

/// Classify one trimmed line. Order matters: food item patterns shadow the
/// keyword rules, which shadow the free-text fallback.
pub fn classify_line(line: &str) -> LineClass {
    match_numbered_item(line)
        .or_else(|| match_emphasis_item(line))
        .or_else(|| match_total_calories(line))
        .or_else(|| match_health_note(line))
        .or_else(|| match_macronutrients(line))
        .or_else(|| match_recommendation(line))
        .unwrap_or(LineClass::NoMatch)
}

/// Parse an analysis text into a [`ParsedSummary`]. Never fails: unparseable
/// input just produces empty fields. For the single-value fields the last
/// matching line wins, matching how the model tends to restate totals at the
/// end of its answer.
pub fn parse(text: &str) -> ParsedSummary {
    let mut summary = ParsedSummary {
        raw_analysis: text.to_string(),
        ..ParsedSummary::default()
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match classify_line(line) {
            LineClass::FoodItem { name, calories } => {
                summary.food_items.push(FoodItem { name, calories });
            }
            LineClass::TotalCalories(total) => summary.total_calories = total,
            LineClass::HealthNote(note) => summary.health_note = note,
            LineClass::Macronutrients(macros) => summary.macronutrients = macros,
            LineClass::Recommendation(text) => summary.recommendation = text,
            LineClass::NoMatch => {}
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_item_line() {
        let summary = parse("1. Grilled Chicken - 250 cal");
        assert_eq!(summary.food_items.len(), 1);
        assert_eq!(summary.food_items[0].name, "Grilled Chicken");
        assert_eq!(summary.food_items[0].calories, "250");
    }

    #[test]
    fn test_numbered_item_strips_emphasis() {
        let summary = parse("2. **Basmati Rice** - 200 Cal");
        assert_eq!(summary.food_items[0].name, "Basmati Rice");
        assert_eq!(summary.food_items[0].calories, "200");
    }

    #[test]
    fn test_emphasis_item_keeps_range_verbatim() {
        let summary = parse("**Dosa (1 large)** - 250-300 cal");
        assert_eq!(summary.food_items.len(), 1);
        assert_eq!(summary.food_items[0].name, "Dosa (1 large)");
        assert_eq!(summary.food_items[0].calories, "250-300");
    }

    #[test]
    fn test_total_calories_labeled() {
        let summary = parse("Total Calories: 1470");
        assert_eq!(summary.total_calories, "1470");
    }

    #[test]
    fn test_total_calories_range_with_spaces() {
        let summary = parse("Total Estimated Calories: 1260 - 1680");
        assert_eq!(summary.total_calories, "1260-1680");
    }

    #[test]
    fn test_total_calories_markdown_label() {
        let summary = parse("**Total Calories:** 820");
        assert_eq!(summary.total_calories, "820");
    }

    #[test]
    fn test_total_calories_last_line_wins() {
        let summary = parse("Total calories: 500\nRevised total calories: 650");
        assert_eq!(summary.total_calories, "650");
    }

    #[test]
    fn test_health_note_captures_whole_line() {
        let summary = parse("Overall this meal is moderately healthy.");
        assert_eq!(summary.health_note, "Overall this meal is moderately healthy.");
    }

    #[test]
    fn test_macronutrient_line() {
        let line = "Roughly 50% carbohydrates, 30% fats, 20% protein.";
        let summary = parse(line);
        assert_eq!(summary.macronutrients, line);
        assert!(summary.recommendation.is_empty());
    }

    #[test]
    fn test_recommendation_needs_length_and_no_marker() {
        let long = "Consider swapping the soda for sparkling water.";
        let summary = parse(long);
        assert_eq!(summary.recommendation, long);

        // Short filler and numbered leftovers are dropped silently.
        let summary = parse("----\nok\n3. stray");
        assert_eq!(summary, ParsedSummary {
            raw_analysis: "----\nok\n3. stray".to_string(),
            ..ParsedSummary::default()
        });
    }

    #[test]
    fn test_empty_input_yields_empty_summary() {
        let summary = parse("");
        assert!(summary.food_items.is_empty());
        assert!(summary.total_calories.is_empty());
        assert!(summary.health_note.is_empty());
        assert!(summary.macronutrients.is_empty());
        assert!(summary.recommendation.is_empty());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let text = "1. Salad - 120 cal\nTotal Calories: 120\nVery healthy choice overall.";
        assert_eq!(parse(text), parse(text));
    }

    #[test]
    fn test_full_response() {
        let text = "\
Here is the calorie breakdown for your meal:

1. Butter Naan - 320 cal
2. **Paneer Tikka** - 280 cal
**Mango Lassi** - 200-250

Total Estimated Calories: 800 - 850

The meal is moderately healthy but heavy on fats.
Roughly 45% carbohydrates, 35% fats, 20% protein.
Try adding a fresh salad to balance the plate next time.";

        let summary = parse(text);
        assert_eq!(summary.food_items.len(), 3);
        assert_eq!(summary.food_items[1].name, "Paneer Tikka");
        assert_eq!(summary.food_items[2].calories, "200-250");
        assert_eq!(summary.total_calories, "800-850");
        assert_eq!(summary.health_note, "The meal is moderately healthy but heavy on fats.");
        assert!(summary.macronutrients.contains("45% carbohydrates"));
        assert!(summary.recommendation.starts_with("Try adding"));
        assert_eq!(summary.raw_analysis, text);
    }

    #[test]
    fn test_classify_single_rules() {
        assert!(matches!(
            classify_line("4. Fries - 365 cal"),
            LineClass::FoodItem { .. }
        ));
        assert!(matches!(
            classify_line("Total daily calories around 2000"),
            LineClass::TotalCalories(_)
        ));
        assert_eq!(classify_line("??"), LineClass::NoMatch);
    }
}
