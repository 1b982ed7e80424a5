// tests/relevance_policy.rs
use news_relay::relevance::{CaseRule, MatchKind, MatchMode, RelevancePolicy, TagGroup};

fn tags() -> Vec<TagGroup> {
    vec![
        TagGroup {
            label: "속보".into(),
            markers: vec!["[속보]".into()],
            emoji: None,
        },
        TagGroup {
            label: "단독".into(),
            markers: vec!["[단독]".into(), "(단독)".into()],
            emoji: Some("⚡".into()),
        },
    ]
}

#[test]
fn tagged_titles_pass_whatever_the_keywords() {
    let keyword_sets: [Vec<String>; 3] = [
        vec![],
        vec!["반도체".into()],
        vec!["전혀 무관한".into(), "other".into()],
    ];
    for keywords in keyword_sets {
        for mode in [MatchMode::Any, MatchMode::TagOnly] {
            let p = RelevancePolicy {
                mode,
                tags: tags(),
                keywords: keywords.clone(),
                ..RelevancePolicy::default()
            };
            for title in ["[속보] 지진 발생", "여당 (단독) 회동", "끝에 붙은 [단독]"] {
                assert!(p.accepts(title), "{title} under {mode:?} / {keywords:?}");
            }
        }
    }
}

#[test]
fn tag_groups_win_over_keywords_in_config_order() {
    let p = RelevancePolicy {
        tags: tags(),
        keywords: vec!["금리".into()],
        ..RelevancePolicy::default()
    };
    let m = p.evaluate("[단독][속보] 금리 인상").unwrap();
    assert_eq!(m.kind, MatchKind::Tag);
    assert_eq!(m.label, "속보", "first group in config order");

    let m = p.evaluate("금리 인상 가능성").unwrap();
    assert_eq!(m.kind, MatchKind::Keyword);
    assert_eq!(m.needle, "금리");
}

#[test]
fn tag_only_ignores_keywords() {
    let p = RelevancePolicy {
        mode: MatchMode::TagOnly,
        tags: tags(),
        keywords: vec!["금리".into()],
        ..RelevancePolicy::default()
    };
    assert!(!p.accepts("금리 인상 가능성"));
}

#[test]
fn latin_folds_case_hangul_matches_exactly() {
    let fold = RelevancePolicy {
        keywords: vec!["openai".into(), "삼성".into()],
        ..RelevancePolicy::default()
    };
    assert!(fold.accepts("OpenAI 새 모델 공개"));
    assert!(fold.accepts("삼성전자 실적"));
    assert!(!fold.accepts("삼 성 전자"));

    let exact = RelevancePolicy {
        case_rule: CaseRule::Exact,
        ..fold.clone()
    };
    assert!(!exact.accepts("OpenAI 새 모델 공개"));
    assert!(exact.accepts("openai 새 모델 공개"));
}

#[test]
fn cleaned_drops_blank_and_duplicate_needles() {
    let p = RelevancePolicy {
        tags: vec![TagGroup {
            label: " 빈 그룹 ".into(),
            markers: vec!["  ".into()],
            emoji: None,
        }],
        keywords: vec![" AI ".into(), "AI".into(), "".into()],
        ..RelevancePolicy::default()
    }
    .cleaned();
    assert!(p.tags.is_empty());
    assert_eq!(p.keywords, vec!["AI".to_string()]);
    assert!(!p.accepts("아무 제목"), "empty needles never match");
    assert_eq!(p.keywords_in("AI 반도체"), vec!["AI"]);
}
