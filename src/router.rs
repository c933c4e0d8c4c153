//! Intent Classifier (Router)
//!
//! Maps normalized text to an ordered, deduplicated set of capability tags
//! via bilingual keyword matching, and derives a natural-language plan
//! describing how the activated agents' findings should be merged.
//!
//! Small talk short-circuits to the creative agent alone, so greetings never
//! fan out through the costly specialist agents.

use crate::models::{CapabilityTag, Language, RouteDecision};

/// More matches than this is a signal the query is too broad.
/// Advisory only; dispatch is never gated on it.
const CLARIFICATION_THRESHOLD: usize = 3;

/// Static keyword lists — zero allocation
const GREETING_PATTERNS: &[&str] = &[
    // English greetings / acknowledgements
    "hi", "hello", "hey", "good morning", "good evening", "thanks", "thank you",
    "ok", "okay", "bye", "goodbye",
    // Arabic greetings / acknowledgements
    "مرحبا", "اهلا", "أهلا", "اهلين", "السلام عليكم", "صباح الخير", "مساء الخير",
    "شكرا", "شكراً", "مع السلامة",
];

/// One rule per capability, evaluated in declaration order.
/// Rules are non-exclusive: several may match the same input.
struct IntentRule {
    tag: CapabilityTag,
    english: &'static [&'static str],
    arabic: &'static [&'static str],
}

const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        tag: CapabilityTag::Finance,
        english: &[
            "debt", "loan", "budget", "expense", "spending", "income", "salary",
            "save money", "saving", "credit card", "pay off", "interest rate",
        ],
        arabic: &[
            "دين", "ديون", "قرض", "ميزانية", "مصاريف", "مصروف", "دخل", "راتب",
            "ادخار", "توفير", "بطاقة ائتمان", "فوائد",
        ],
    },
    IntentRule {
        tag: CapabilityTag::Portfolio,
        english: &[
            "invest", "portfolio", "stock", "share", "bond", "etf", "asset",
            "allocation", "diversif", "market", "fund",
        ],
        arabic: &[
            "استثمار", "استثمر", "محفظة", "أسهم", "اسهم", "سهم", "سندات",
            "أصول", "اصول", "صندوق",
        ],
    },
    IntentRule {
        tag: CapabilityTag::DataAnalyst,
        english: &[
            "analyze", "analysis", "trend", "compare", "comparison", "statistics",
            "breakdown", "cash flow", "chart",
        ],
        arabic: &[
            "حلل", "تحليل", "اتجاه", "مقارنة", "قارن", "إحصائيات", "احصائيات",
            "تدفق نقدي",
        ],
    },
    IntentRule {
        tag: CapabilityTag::Scam,
        english: &[
            "scam", "fraud", "phishing", "suspicious", "fake", "ponzi",
            "too good to be true", "guaranteed return",
        ],
        arabic: &["احتيال", "نصب", "تصيد", "مشبوه", "وهمي", "عرض مضمون"],
    },
    IntentRule {
        tag: CapabilityTag::Summarizer,
        english: &["summarize", "summary", "news", "recap", "overview", "brief me"],
        arabic: &["لخص", "ملخص", "أخبار", "اخبار", "موجز"],
    },
    IntentRule {
        tag: CapabilityTag::Creative,
        english: &["write", "poem", "story", "joke", "idea", "imagine", "name for"],
        arabic: &["اكتب", "قصيدة", "قصة", "نكتة", "فكرة", "تخيل"],
    },
];

/// Pure greeting or acknowledgement: the whole message, stripped of
/// punctuation, is one of the known patterns. Also used by the creative
/// agent to answer greetings without a model round-trip.
pub fn is_greeting(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| !c.is_ascii_punctuation() && *c != '؟' && *c != '،')
        .collect();
    let stripped = stripped.trim();

    GREETING_PATTERNS.iter().any(|p| *p == stripped)
}

fn rule_matches(rule: &IntentRule, lowered: &str) -> bool {
    rule.english.iter().any(|kw| lowered.contains(kw))
        || rule.arabic.iter().any(|kw| lowered.contains(kw))
}

/// Classify a normalized message into capability intents plus a merge plan.
///
/// The returned intent list is never empty: unmatched input defaults to the
/// creative agent, which doubles as the catch-all conversational responder.
pub fn classify(text: &str, original_language: Language) -> RouteDecision {
    let lowered = text.to_lowercase();

    if is_greeting(text) {
        return RouteDecision {
            intents: vec![CapabilityTag::Creative],
            plan: build_plan(&[CapabilityTag::Creative], original_language),
            needs_clarification: false,
        };
    }

    let mut intents: Vec<CapabilityTag> = Vec::new();
    for rule in INTENT_RULES {
        if rule_matches(rule, &lowered) && !intents.contains(&rule.tag) {
            intents.push(rule.tag);
        }
    }

    if intents.is_empty() {
        intents.push(CapabilityTag::Creative);
    }

    let needs_clarification = intents.len() > CLARIFICATION_THRESHOLD;
    let plan = build_plan(&intents, original_language);

    RouteDecision {
        intents,
        plan,
        needs_clarification,
    }
}

/// Assemble the combination plan from canned fragments for each recognized
/// combination of active intents, always ending with the output-language
/// directive.
fn build_plan(intents: &[CapabilityTag], original_language: Language) -> String {
    let has = |tag| intents.contains(&tag);
    let mut fragments: Vec<&str> = Vec::new();

    if has(CapabilityTag::Finance) && has(CapabilityTag::Portfolio) {
        fragments.push(
            "Weigh the budgeting guidance against the investment view and \
             present one unified recommendation.",
        );
    }
    if has(CapabilityTag::DataAnalyst) {
        fragments.push("Ground the answer in the numeric analysis where figures are available.");
    }
    if has(CapabilityTag::Scam) {
        fragments.push("State the scam-risk verdict clearly before any other advice.");
    }
    if has(CapabilityTag::Summarizer) {
        fragments.push("Fold the news summary in as supporting context, not as the lead.");
    }
    if has(CapabilityTag::Creative) {
        fragments.push("Keep the tone conversational and approachable.");
    }

    let language_directive = match original_language {
        Language::En => "Write the final answer in English.",
        // Mixed never survives normalization, but map it the same way
        Language::Ar | Language::Mixed => "Write the final answer in Arabic.",
    };
    fragments.push(language_directive);

    fragments.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_short_circuit() {
        for greeting in ["hi", "hello", "Hello!", "مرحبا", "thanks"] {
            let decision = classify(greeting, Language::En);
            assert_eq!(
                decision.intents,
                vec![CapabilityTag::Creative],
                "greeting: {:?}",
                greeting
            );
            assert!(!decision.needs_clarification);
        }
    }

    #[test]
    fn test_intents_never_empty() {
        let cases = ["", "qwertyuiop", "42", "ماذا", "what about the weather"];
        for case in cases {
            let decision = classify(case, Language::En);
            assert!(!decision.intents.is_empty(), "input: {:?}", case);
        }
    }

    #[test]
    fn test_unmatched_defaults_to_creative() {
        let decision = classify("tell me something interesting", Language::En);
        assert_eq!(decision.intents, vec![CapabilityTag::Creative]);
    }

    #[test]
    fn test_debt_and_invest_activate_finance_and_portfolio() {
        let decision = classify(
            "Should I pay off my credit card debt or invest?",
            Language::En,
        );
        assert!(decision.intents.contains(&CapabilityTag::Finance));
        assert!(decision.intents.contains(&CapabilityTag::Portfolio));
        assert!(decision.plan.contains("unified recommendation"));
        assert!(decision.plan.contains("English"));
    }

    #[test]
    fn test_arabic_keywords_match() {
        let decision = classify("هل أسدد الديون أم أبدأ الاستثمار؟", Language::Ar);
        assert!(decision.intents.contains(&CapabilityTag::Finance));
        assert!(decision.intents.contains(&CapabilityTag::Portfolio));
        assert!(decision.plan.contains("Arabic"));
    }

    #[test]
    fn test_intent_order_follows_rule_declaration() {
        let decision = classify("analyze my debt and my stock portfolio", Language::En);
        assert_eq!(
            decision.intents,
            vec![
                CapabilityTag::Finance,
                CapabilityTag::Portfolio,
                CapabilityTag::DataAnalyst,
            ]
        );
    }

    #[test]
    fn test_clarification_flag_above_threshold() {
        let decision = classify(
            "analyze my debt, summarize the news, check this scam and my stocks",
            Language::En,
        );
        assert!(decision.intents.len() > 3);
        assert!(decision.needs_clarification);
    }

    #[test]
    fn test_no_duplicate_intents() {
        let decision = classify("debt debt loan budget expense", Language::En);
        assert_eq!(decision.intents, vec![CapabilityTag::Finance]);
    }

    #[test]
    fn test_scam_plan_fragment() {
        let decision = classify("is this offer a scam?", Language::En);
        assert_eq!(decision.intents, vec![CapabilityTag::Scam]);
        assert!(decision.plan.contains("scam-risk verdict"));
    }
}
