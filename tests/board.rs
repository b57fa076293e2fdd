mod common;

use chrono::Utc;
use common::{at, fields, setup_db};
use triage_board::config::WhatsAppConfig;
use triage_board::notifications::{BoardRenderer, WhatsAppClient};
use triage_board::triage::menus::PatientMenu;
use triage_board::triage::{
    create_entry, list_active, transition_entry, BoardPolicy, BoardQuery,
};
use triage_board::worker::{render_board, WorkerContext};

fn surnames(rows: &[triage_board::triage::EntryRecord]) -> Vec<&str> {
    rows.iter().map(|r| r.entry.surname.as_str()).collect()
}

#[tokio::test]
async fn completed_entries_stay_until_the_board_rolls_over() {
    let db = setup_db().await;
    create_entry(
        &db,
        &fields(&[("surname", "Moyo"), ("patient_id", "MRN-1"), ("urgency", "2")]),
        at(1, 22, 0),
    )
    .await
    .unwrap();
    create_entry(&db, &fields(&[("surname", "Banda")]), at(1, 21, 0))
        .await
        .unwrap();
    transition_entry(
        &db,
        &fields(&[("patient_id", "MRN-1"), ("option", "Completed")]),
        at(1, 23, 0),
    )
    .await
    .unwrap();

    let policy = BoardPolicy::default();
    let query = BoardQuery::default();

    let early = list_active(&db, &query, &policy, at(2, 4, 30)).await.unwrap();
    assert_eq!(surnames(&early), vec!["Banda", "Moyo"]);

    let later = list_active(&db, &query, &policy, at(2, 8, 0)).await.unwrap();
    assert_eq!(surnames(&later), vec!["Banda"]);
}

#[tokio::test]
async fn cancelled_entries_are_excluded() {
    let db = setup_db().await;
    let cancelled = create_entry(&db, &fields(&[("surname", "Gone")]), at(2, 6, 0))
        .await
        .unwrap();
    create_entry(&db, &fields(&[("surname", "Kept")]), at(2, 6, 5))
        .await
        .unwrap();
    let reference = cancelled.entry.id.to_string();
    transition_entry(
        &db,
        &fields(&[("patient_id", reference.as_str()), ("option", "ChangeOrCancel")]),
        at(2, 7, 0),
    )
    .await
    .unwrap();

    let rows = list_active(&db, &BoardQuery::default(), &BoardPolicy::default(), at(2, 8, 0))
        .await
        .unwrap();
    assert_eq!(surnames(&rows), vec!["Kept"]);
}

#[tokio::test]
async fn open_entries_order_by_urgency_then_latest_decision() {
    let db = setup_db().await;
    for (surname, urgency, minute) in [("A", "3", 0), ("B", "1", 5), ("C", "1", 10), ("D", "5", 15)] {
        create_entry(
            &db,
            &fields(&[("surname", surname), ("urgency", urgency)]),
            at(2, 6, minute),
        )
        .await
        .unwrap();
    }

    let rows = list_active(&db, &BoardQuery::default(), &BoardPolicy::default(), at(2, 8, 0))
        .await
        .unwrap();
    assert_eq!(surnames(&rows), vec!["C", "B", "A", "D"]);
}

#[tokio::test]
async fn search_and_status_filters_apply_to_stored_rows() {
    let db = setup_db().await;
    create_entry(
        &db,
        &fields(&[
            ("surname", "Moyo"),
            ("name", "Tariro Moyo"),
            ("patient_id", "MRN-4471"),
            ("urgency", "2"),
        ]),
        at(2, 6, 0),
    )
    .await
    .unwrap();
    create_entry(&db, &fields(&[("surname", "Banda"), ("urgency", "2")]), at(2, 6, 5))
        .await
        .unwrap();
    create_entry(&db, &fields(&[("surname", "Phiri"), ("urgency", "4")]), at(2, 6, 10))
        .await
        .unwrap();

    let policy = BoardPolicy::default();
    let now = at(2, 8, 0);

    let by_identifier = BoardQuery::parse(Some("mrn-44"), None).unwrap();
    let rows = list_active(&db, &by_identifier, &policy, now).await.unwrap();
    assert_eq!(surnames(&rows), vec!["Moyo"]);

    let tier_two = BoardQuery::parse(None, Some("2")).unwrap();
    let rows = list_active(&db, &tier_two, &policy, now).await.unwrap();
    assert_eq!(surnames(&rows), vec!["Banda", "Moyo"]);

    let complete = BoardQuery::parse(None, Some("complete")).unwrap();
    assert!(list_active(&db, &complete, &policy, now).await.unwrap().is_empty());
}

#[tokio::test]
async fn long_boards_split_into_menu_chunks() {
    let db = setup_db().await;
    for i in 0..33 {
        let surname = format!("Patient{:02}", i);
        create_entry(&db, &fields(&[("surname", surname.as_str())]), at(2, 6, i))
            .await
            .unwrap();
    }

    let rows = list_active(&db, &BoardQuery::default(), &BoardPolicy::default(), at(2, 8, 0))
        .await
        .unwrap();
    let menu = PatientMenu::from_board(&rows);

    assert_eq!(menu.lists.len(), 4);
    assert_eq!(menu.lists[3].lines().count(), 3);
    assert!(menu.lists[0].starts_with("1) Patient32 CS"));
    assert_eq!(menu.patient_ids.split('|').count(), 33);

    let body = menu.to_json();
    assert_eq!(body["list_count"], 4);
    assert!(body.get("patient_list_4").is_some());
}

#[tokio::test]
async fn worker_renders_the_current_board() {
    let db = setup_db().await;
    create_entry(&db, &fields(&[("surname", "Moyo"), ("urgency", "1")]), Utc::now())
        .await
        .unwrap();

    let context = WorkerContext {
        db,
        renderer: BoardRenderer::new().unwrap(),
        whatsapp: WhatsAppClient::new(&WhatsAppConfig::default()),
        policy: BoardPolicy::default(),
    };

    let html = render_board(&context).await.unwrap();
    assert!(html.contains("Moyo"));
    assert!(html.contains("urgency-red"));
    assert!(!html.contains("No patients on the board"));
}
