use serde_json::json;
use std::io::Cursor;
use tower_staffing::workflows::import::{
    parse_csv_candidates, parse_model_text, preview, reconcile, reconcile_import, ImportAction,
    ImportError, ImportSummary,
};
use tower_staffing::workflows::roster::{Category, NewResident, Roster, SkillSet};

fn tower_with_perry() -> Roster {
    let mut roster = Roster::new();
    roster
        .add_resident(NewResident {
            name: "Perry Mitchell".to_string(),
            skills: SkillSet::uniform(4),
            dream_job: None,
        })
        .expect("resident");
    roster
}

#[test]
fn case_different_name_updates_only_food() {
    let payload = json!([{ "name": "perry MITCHELL", "skills": { "Food": 9 } }]);

    let (roster, summary) = reconcile_import(tower_with_perry(), &payload).expect("import");

    assert_eq!(summary, ImportSummary { created: 0, updated: 1 });
    let perry = &roster.residents()[0];
    assert_eq!(perry.name, "Perry Mitchell");
    assert_eq!(perry.skills, SkillSet::uniform(4).with(Category::Food, 9));
}

#[test]
fn one_bad_record_rejects_the_batch() {
    let payload = json!([
        { "name": "Lola", "skills": { "Retail": 7 } },
        { "name": "", "skills": { "Retail": 7 } }
    ]);
    match reconcile_import(tower_with_perry(), &payload) {
        Err(ImportError::Malformed { reason }) => assert!(reason.contains("record 2")),
        other => panic!("expected malformed batch, got {other:?}"),
    }
}

#[test]
fn model_response_flows_through_preview_and_reconcile() {
    let response = "Here are the residents:\n```json\n[\n  {\"name\":\"PERRY MITCHELL\",\"skills\":{\"Food\":0,\"Service\":1,\"Recreation\":9,\"Retail\":2,\"Creative\":9},\"fav\":\"MECHANIC\"},\n  {\"name\":\"Lola Reyes\",\"skills\":{\"Food\":3,\"Service\":null,\"Recreation\":4,\"Retail\":8,\"Creative\":1}}\n]\n```";

    let batch = parse_model_text(response).expect("parsed");
    let roster = tower_with_perry();
    let rows = preview(&roster, &batch);
    assert_eq!(
        rows.iter().map(|row| row.action).collect::<Vec<_>>(),
        vec![ImportAction::Update, ImportAction::Create]
    );

    let (roster, summary) = reconcile(roster, batch);
    assert_eq!(summary.to_string(), "1 added, 1 updated");

    let perry = roster.resident_by_name("Perry Mitchell").expect("perry");
    assert_eq!(perry.skills.recreation, 9);
    assert_eq!(perry.dream_job.as_deref(), Some("MECHANIC"));

    let lola = roster.resident_by_name("lola reyes").expect("lola");
    assert_eq!(lola.skills.service, 5);
    assert_eq!(lola.skills.retail, 8);
    assert_eq!(lola.dream_job, None);
}

#[test]
fn csv_export_imports_like_json() {
    let data = "Name,Food,Service,Recreation,Retail,Creative,Dream Job\n\
                Perry Mitchell,1,,,,,Mechanic\n\
                Lola Reyes,3,5,4,8,1,\n";
    let batch = parse_csv_candidates(Cursor::new(data)).expect("csv");
    let (roster, summary) = reconcile(tower_with_perry(), batch);

    assert_eq!(summary, ImportSummary { created: 1, updated: 1 });
    let perry = roster.resident_by_name("perry mitchell").expect("perry");
    assert_eq!(perry.skills, SkillSet::uniform(4).with(Category::Food, 1));
    assert_eq!(perry.dream_job.as_deref(), Some("Mechanic"));
}
