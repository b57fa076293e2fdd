mod common;

use common::{at, fields, setup_db};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use triage_board::entities::{Baby, PatientEntry};
use triage_board::error::TriageError;
use triage_board::triage::{create_entry, find_active, find_entry, transition_entry, StatusOption};

async fn seed(db: &DatabaseConnection) -> i32 {
    create_entry(
        db,
        &fields(&[("surname", "Moyo"), ("patient_id", "MRN-1")]),
        at(2, 8, 0),
    )
    .await
    .unwrap()
    .entry
    .id
}

#[tokio::test]
async fn twins_complete_on_the_second_delivery() {
    let db = setup_db().await;
    let entry_id = seed(&db).await;

    let first = transition_entry(
        &db,
        &fields(&[
            ("patient_id", "MRN-1"),
            ("option", "Delivery"),
            ("foetus", "2"),
            ("baby_number", "1"),
            ("apgar_1", "7"),
            ("apgar_5", "9"),
            ("baby_weight_grams", "2800"),
        ]),
        at(2, 10, 0),
    )
    .await
    .unwrap();

    assert_eq!(first.option, StatusOption::Delivery);
    assert!(first.record.entry.is_active());
    assert_eq!(first.record.entry.foetus, Some(2));
    let baby = first.baby.unwrap();
    assert_eq!(baby.baby_number, 1);
    assert_eq!(baby.delivery_time, at(2, 10, 0));
    assert_eq!(baby.nicu, Some(false));
    assert_eq!(baby.baby_weight_grams, Some(2800));

    let second = transition_entry(
        &db,
        &fields(&[
            ("patient_id", "MRN-1"),
            ("option", "Delivery"),
            ("foetus", "2"),
            ("baby_number", "2"),
            ("nicu", "Yes"),
        ]),
        at(2, 10, 2),
    )
    .await
    .unwrap();

    assert_eq!(second.record.entry.completion_time, Some(at(2, 10, 2)));
    assert_eq!(second.record.entry.active_key, None);
    assert_eq!(second.baby.unwrap().nicu, Some(true));

    let (_, babies) = find_entry(&db, entry_id).await.unwrap().unwrap();
    assert_eq!(babies.len(), 2);
    assert!(find_active(&db, "MRN-1").await.unwrap().is_none());
}

#[tokio::test]
async fn repeated_delivery_updates_the_same_baby() {
    let db = setup_db().await;
    seed(&db).await;
    let delivery = |apgar: &'static str| {
        fields(&[
            ("patient_id", "MRN-1"),
            ("option", "Delivery"),
            ("foetus", "2"),
            ("baby_number", "1"),
            ("apgar_1", apgar),
        ])
    };

    let first = transition_entry(&db, &delivery("6"), at(2, 10, 0)).await.unwrap();
    let again = transition_entry(&db, &delivery("8"), at(2, 10, 5)).await.unwrap();

    assert_eq!(Baby::find().count(&db).await.unwrap(), 1);
    let (first_baby, again_baby) = (first.baby.unwrap(), again.baby.unwrap());
    assert_eq!(first_baby.id, again_baby.id);
    assert_eq!(again_baby.apgar_1, Some(8));
}

#[tokio::test]
async fn completed_uses_supplied_or_current_time() {
    let db = setup_db().await;
    seed(&db).await;

    let done = transition_entry(
        &db,
        &fields(&[
            ("patient_id", "MRN-1"),
            ("option", "Completed"),
            ("completion_time", "2026-03-02 09:45+00:00"),
        ]),
        at(2, 10, 0),
    )
    .await
    .unwrap();

    assert_eq!(done.record.entry.completion_time, Some(at(2, 9, 45)));
    assert!(done.baby.is_none());
}

#[tokio::test]
async fn non_delivery_records_anaesthesia() {
    let db = setup_db().await;
    seed(&db).await;

    let done = transition_entry(
        &db,
        &fields(&[
            ("patient_id", "MRN-1"),
            ("option", "NonDelivery"),
            ("anesthetic_time", "2026-03-02 09:30"),
            ("starvation_hours", "8"),
        ]),
        at(2, 10, 0),
    )
    .await
    .unwrap();

    assert_eq!(done.record.entry.anesthetic_time, Some(at(2, 9, 30)));
    assert_eq!(done.record.entry.starvation_hours, Some(8));
    assert_eq!(done.record.entry.completion_time, Some(at(2, 10, 0)));
}

#[tokio::test]
async fn cancelled_entry_leaves_the_active_set() {
    let db = setup_db().await;
    let entry_id = seed(&db).await;

    let cancelled = transition_entry(
        &db,
        &fields(&[("patient_id", "MRN-1"), ("option", "ChangeOrCancel")]),
        at(2, 10, 0),
    )
    .await
    .unwrap();

    assert!(cancelled.record.entry.operation_cancelled);
    assert_eq!(cancelled.record.entry.completion_time, None);
    assert!(find_active(&db, "MRN-1").await.unwrap().is_none());
    assert!(find_active(&db, &entry_id.to_string()).await.unwrap().is_none());
}

#[tokio::test]
async fn missing_patient_reference_is_a_validation_error() {
    let db = setup_db().await;

    let err = transition_entry(&db, &fields(&[("option", "Completed")]), at(2, 10, 0))
        .await
        .unwrap_err();

    assert_eq!(err.errors(), vec!["Patient ID is required"]);
}

#[tokio::test]
async fn lookup_happens_before_option_check() {
    let db = setup_db().await;

    let err = transition_entry(&db, &fields(&[("patient_id", "404")]), at(2, 10, 0))
        .await
        .unwrap_err();

    assert!(matches!(err, TriageError::NotFound(_)));
}

#[tokio::test]
async fn unsupported_option_mutates_nothing() {
    let db = setup_db().await;
    let entry_id = seed(&db).await;
    let before = PatientEntry::find_by_id(entry_id).one(&db).await.unwrap().unwrap();

    for option in [None, Some("GobbledyGook")] {
        let mut input = fields(&[("patient_id", "MRN-1")]);
        if let Some(option) = option {
            input.insert("option".into(), option.into());
        }
        let err = transition_entry(&db, &input, at(2, 10, 0)).await.unwrap_err();
        assert!(matches!(err, TriageError::UnsupportedOption(_)));
    }

    let after = PatientEntry::find_by_id(entry_id).one(&db).await.unwrap().unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn invalid_delivery_records_no_baby() {
    let db = setup_db().await;
    let entry_id = seed(&db).await;

    let err = transition_entry(
        &db,
        &fields(&[
            ("patient_id", "MRN-1"),
            ("option", "Delivery"),
            ("foetus", "1"),
            ("baby_number", "2"),
        ]),
        at(2, 10, 0),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, TriageError::Validation(_)));
    assert_eq!(Baby::find().count(&db).await.unwrap(), 0);
    let entry = PatientEntry::find_by_id(entry_id).one(&db).await.unwrap().unwrap();
    assert!(entry.is_active());
    assert_eq!(entry.foetus, None);
}
