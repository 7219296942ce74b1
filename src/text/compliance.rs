use serde::{Deserialize, Serialize};

use crate::core::model::Language;

pub const DEFAULT_MIN_WORDS: usize = 2000;
pub const DEFAULT_MIN_PARAGRAPHS: usize = 8;

/// Word and paragraph minimums for academic-style documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceParams {
    pub min_words: usize,
    pub min_paragraphs: usize,
    pub language: Language,
}

impl Default for ComplianceParams {
    fn default() -> Self {
        Self {
            min_words: DEFAULT_MIN_WORDS,
            min_paragraphs: DEFAULT_MIN_PARAGRAPHS,
            language: Language::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceReport {
    pub is_compliant: bool,
    pub issues: Vec<String>,
}

/// Words must exceed the minimum; paragraphs only need to reach it.
pub fn check_compliance(
    word_count: usize,
    num_paragraphs: usize,
    params: &ComplianceParams,
) -> ComplianceReport {
    let words_ok = word_count > params.min_words;
    let paragraphs_ok = num_paragraphs >= params.min_paragraphs;

    let mut issues = Vec::new();
    if !words_ok {
        let missing = params.min_words - word_count + 1;
        issues.push(match params.language {
            Language::En => format!(
                "only {word_count} words (must exceed {}; {missing} more needed)",
                params.min_words
            ),
            Language::Pt => format!(
                "apenas {word_count} palavras (mínimo: mais de {}; faltam {missing})",
                params.min_words
            ),
        });
    }
    if !paragraphs_ok {
        let missing = params.min_paragraphs - num_paragraphs;
        issues.push(match params.language {
            Language::En => format!(
                "only {num_paragraphs} paragraphs (minimum: {}; {missing} more needed)",
                params.min_paragraphs
            ),
            Language::Pt => format!(
                "apenas {num_paragraphs} parágrafos (mínimo: {}; faltam {missing})",
                params.min_paragraphs
            ),
        });
    }

    ComplianceReport {
        is_compliant: words_ok && paragraphs_ok,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(language: Language) -> ComplianceParams {
        ComplianceParams {
            language,
            ..ComplianceParams::default()
        }
    }

    #[test]
    fn word_minimum_is_strict() {
        let report = check_compliance(2000, 10, &params(Language::En));
        assert!(!report.is_compliant);
        assert_eq!(report.issues, vec!["only 2000 words (must exceed 2000; 1 more needed)"]);
        assert!(check_compliance(2001, 10, &params(Language::En)).is_compliant);
    }

    #[test]
    fn paragraph_minimum_is_inclusive() {
        let report = check_compliance(2500, 8, &params(Language::En));
        assert!(report.is_compliant);
        assert!(report.issues.is_empty());
        assert!(!check_compliance(2500, 7, &params(Language::En)).is_compliant);
    }

    #[test]
    fn lists_every_failed_threshold_in_portuguese() {
        let report = check_compliance(500, 5, &params(Language::Pt));
        assert!(!report.is_compliant);
        assert_eq!(
            report.issues,
            vec![
                "apenas 500 palavras (mínimo: mais de 2000; faltam 1501)",
                "apenas 5 parágrafos (mínimo: 8; faltam 3)",
            ]
        );
    }

    #[test]
    fn zero_minimums_accept_one_word() {
        let lenient = ComplianceParams {
            min_words: 0,
            min_paragraphs: 0,
            language: Language::En,
        };
        assert!(!check_compliance(0, 0, &lenient).is_compliant);
        assert!(check_compliance(1, 0, &lenient).is_compliant);
    }
}
