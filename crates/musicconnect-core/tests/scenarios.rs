use std::sync::Arc;

use musicconnect_core::{
    ActionOutcome, ActivityGenerator, IdeasPhase, Session, DETAIL_ERROR_MESSAGE,
};
use musicconnect_memory::{KeyValueStore, MemoryKeyValueStore, ProposalStore, STORAGE_KEY};
use musicconnect_provider::ScriptedProvider;
use musicconnect_schema::{Difficulty, SavedActivity, TargetGroup};
use serde_json::{json, Value};

struct Harness {
    provider: Arc<ScriptedProvider>,
    backend: MemoryKeyValueStore,
    session: Session,
}

fn harness() -> Harness {
    let provider = Arc::new(ScriptedProvider::new());
    let backend = MemoryKeyValueStore::new();
    let generator = ActivityGenerator::new(provider.clone(), "gemini-2.5-flash");
    let store = ProposalStore::load(Arc::new(backend.clone()));
    Harness {
        provider,
        backend,
        session: Session::new(generator, store),
    }
}

fn idea_batch(prefix: &str) -> Value {
    let difficulties = ["Low", "Medium", "High", "Low", "Medium"];
    Value::Array(
        difficulties
            .iter()
            .enumerate()
            .map(|(i, difficulty)| {
                json!({
                    "id": format!("{}", i + 1),
                    "title": format!("{prefix} {}", i + 1),
                    "description": "กิจกรรมดนตรีสำหรับผู้สูงอายุ",
                    "tags": ["Music Therapy", "Fun"],
                    "duration": "2 ชั่วโมง",
                    "difficulty": difficulty,
                    "impactArea": "Mental Health"
                })
            })
            .collect(),
    )
}

fn detail_json(title: &str, budget: &str) -> Value {
    json!({
        "title": title,
        "fullDescription": "การประกวดวงดนตรีสากลระดับมัธยมศึกษา",
        "objectives": ["ส่งเสริมทักษะดนตรี", "เปิดเวทีให้เยาวชน"],
        "targetAudienceDetail": "นักเรียนมัธยมศึกษาตอนปลาย",
        "stepByStepPlan": ["เดือนที่ 1: ประชาสัมพันธ์", "เดือนที่ 2: คัดเลือก", "เดือนที่ 3: รอบชิงชนะเลิศ"],
        "requiredEquipment": ["เวที", "ระบบเสียง"],
        "budgetEstimate": budget,
        "evaluationMetrics": ["จำนวนวงที่สมัคร"]
    })
}

fn persisted(backend: &MemoryKeyValueStore) -> Vec<SavedActivity> {
    backend
        .read(STORAGE_KEY)
        .unwrap()
        .map(|raw| serde_json::from_str(&raw).unwrap())
        .unwrap_or_default()
}

#[tokio::test]
async fn scenario_a_discover_elderly_returns_five_valid_ideas() {
    let mut h = harness();
    h.provider.push_json(&idea_batch("ดนตรีบำบัด"));

    let outcome = h.session.discover(TargetGroup::Elderly).await;

    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(h.session.ideas().len(), 5);
    assert!(h
        .session
        .ideas()
        .iter()
        .all(|idea| Difficulty::ALL.contains(&idea.difficulty)));
    assert_eq!(h.session.ideas_phase(), IdeasPhase::Idle);
    assert!(h.session.ideas_error().is_none());

    let prompt = h.provider.requests()[0].prompt().to_string();
    assert!(prompt.contains(TargetGroup::Elderly.description()));
}

#[tokio::test]
async fn scenario_b_load_more_appends_after_original_batch() {
    let mut h = harness();
    h.provider.push_json(&idea_batch("ชุดแรก"));
    h.provider.push_json(&idea_batch("ชุดสอง"));

    h.session.discover(TargetGroup::Elderly).await;
    let first: Vec<String> = h.session.ideas().iter().map(|i| i.title.clone()).collect();

    let outcome = h.session.load_more().await;

    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(h.session.ideas().len(), 10);
    let titles: Vec<String> = h.session.ideas().iter().map(|i| i.title.clone()).collect();
    assert_eq!(&titles[..5], first.as_slice());

    let prompt = h.provider.requests()[1].prompt().to_string();
    for title in &first {
        assert!(prompt.contains(title.as_str()));
    }
}

#[tokio::test]
async fn scenario_c_custom_generate_keeps_user_budget() {
    let mut h = harness();
    let request = "ประกวดดนตรีสากล มัธยมศึกษา งบ 100,000 บาท";
    h.provider
        .push_json(&detail_json("ประกวดวงดนตรีสากล", "รวมทั้งสิ้น 100,000 บาท"));

    let outcome = h.session.custom_generate(request).await;

    assert_eq!(outcome, ActionOutcome::Applied);
    assert!(h.session.custom_error().is_none());
    let view = h.session.detail_view().unwrap();
    assert!(view.error().is_none());
    assert!(view.detail().unwrap().budget_estimate.contains("100,000"));
    assert!(h.provider.requests()[0].prompt().contains(request));
}

#[tokio::test]
async fn scenario_d_toggle_save_twice_empties_store() {
    let mut h = harness();
    h.provider.push_json(&detail_json("X", "20,000 บาท"));
    h.session.custom_generate("X").await;

    assert!(h.session.toggle_save().unwrap());
    assert_eq!(h.session.store().len(), 1);
    assert_eq!(persisted(&h.backend).len(), 1);

    assert!(!h.session.toggle_save().unwrap());
    assert_eq!(h.session.store().len(), 0);
    assert!(persisted(&h.backend).is_empty());
}

#[tokio::test]
async fn scenario_e_empty_detail_response_shows_error() {
    let mut h = harness();
    h.provider.push_json(&idea_batch("ไอเดีย"));
    h.provider.push_text("");

    h.session.discover(TargetGroup::Hospital).await;
    let outcome = h.session.view_detail(0).await;

    assert_eq!(outcome, ActionOutcome::Failed);
    let view = h.session.detail_view().unwrap();
    assert_eq!(view.error(), Some(DETAIL_ERROR_MESSAGE));
    assert!(view.detail().is_none());
    assert!(h.session.store().is_empty());
    assert!(!h.session.store().is_saved("ไอเดีย 1"));
    assert_eq!(h.session.ideas().len(), 5);
}

#[tokio::test]
async fn toggling_a_saved_proposal_twice_keeps_other_entries_in_order() {
    let mut h = harness();
    for title in ["A", "B", "C"] {
        h.provider.push_json(&detail_json(title, "20,000 บาท"));
        h.session.custom_generate(title).await;
        h.session.toggle_save().unwrap();
    }
    let before: Vec<String> = h.session.store().list().iter().map(|s| s.id.clone()).collect();

    let middle = h.session.store().list()[1].id.clone();
    h.session.open_saved(&middle).unwrap();
    h.session.toggle_save().unwrap();
    h.session.toggle_save().unwrap();

    let titles: Vec<&str> = h.session.store().list().iter().map(|s| s.title()).collect();
    assert_eq!(titles, vec!["B", "C", "A"]);
    let after: Vec<String> = h.session.store().list().iter().map(|s| s.id.clone()).collect();
    assert_eq!(&after[1..], &[before[0].clone(), before[2].clone()]);
    assert_eq!(persisted(&h.backend), h.session.store().list());
}

#[tokio::test]
async fn refine_of_saved_proposal_persists_only_on_save_edit() {
    let mut h = harness();
    h.provider.push_json(&detail_json("คอนเสิร์ต", "50,000 บาท"));
    h.provider.push_json(&detail_json("คอนเสิร์ต", "10,000 บาท"));

    h.session.custom_generate("คอนเสิร์ต").await;
    h.session.toggle_save().unwrap();

    assert!(h.session.refine("ลดงบเหลือ 10,000 บาท").await.is_applied());
    assert_eq!(persisted(&h.backend)[0].detail.budget_estimate, "50,000 บาท");

    h.session.save_edit().unwrap();
    assert_eq!(persisted(&h.backend)[0].detail.budget_estimate, "10,000 บาท");
    let view = h.session.detail_view().unwrap();
    assert!(!view.is_editing());
    assert_eq!(view.detail().unwrap().budget_estimate, "10,000 บาท");
}

#[tokio::test]
async fn concurrent_load_more_and_refine_both_apply() {
    let mut h = harness();
    h.provider.push_json(&idea_batch("ชุดแรก"));
    h.provider.push_json(&detail_json("ชุดแรก 1", "20,000 บาท"));
    h.session.discover(TargetGroup::School).await;
    h.session.view_detail(0).await;

    h.provider.push_json(&idea_batch("ชุดสอง"));
    h.provider.push_json(&detail_json("ชุดแรก 1", "15,000 บาท"));

    let generator = h.session.generator().clone();
    let more = h.session.begin_load_more().unwrap();
    let refine = h.session.begin_refine("ลดงบ").unwrap();
    let (ideas, refined) = tokio::join!(more.run(&generator), refine.run(&generator));

    assert!(h.session.finish_refine(refine, refined).is_applied());
    assert!(h.session.finish_ideas(more, ideas).is_applied());
    assert_eq!(h.session.ideas().len(), 10);
    assert!(h.session.detail_view().unwrap().is_editing());
}
