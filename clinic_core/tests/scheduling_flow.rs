mod common;

use clinic_core::facility::EligibilityRules;
use clinic_core::locator::{ADDRESS_NOT_FOUND_NOTICE, FacilityLocator};
use clinic_core::memory::MemoryStore;
use clinic_core::ranking::ProximityRanker;
use clinic_core::scheduling::{
    ScheduleRequest, SchedulingError, SchedulingService, ValidationError,
};
use clinic_core::triage::NewPatient;
use common::{PATIENT_ORIGIN, StubGeocoder, facility_north_of_origin};

const ADDRESS: &str = "Praça da Sé, São Paulo";

fn store() -> MemoryStore {
    MemoryStore::with_facilities(vec![
        facility_north_of_origin(1, "UBS Centro", "Rua A, 10", 2.0),
        facility_north_of_origin(2, "Posto Geral", "Rua B, 20", 1.0),
        facility_north_of_origin(3, "AMA Sul", "Rua C, 30", 8.0),
        facility_north_of_origin(4, "UBS Centro", "Rua A, 10", 2.5),
    ])
}

fn locator(store: &MemoryStore, geocoder: StubGeocoder) -> FacilityLocator<StubGeocoder, MemoryStore> {
    FacilityLocator::new(
        geocoder,
        store.clone(),
        EligibilityRules::default(),
        ProximityRanker::default(),
    )
}

fn patient(store: &MemoryStore, name: &str) -> i32 {
    store
        .add_patient(NewPatient {
            name: name.to_string(),
            age: "40".to_string(),
            address: ADDRESS.to_string(),
            ..NewPatient::default()
        })
        .id
}

fn form(facility_id: Option<&str>) -> ScheduleRequest {
    ScheduleRequest {
        facility_id: facility_id.map(str::to_string),
        date: Some("2026-10-20".to_string()),
        time: Some("09:30".to_string()),
        urgency: Some("média".to_string()),
    }
}

#[tokio::test]
async fn ranks_only_named_units_inside_radius() {
    let store = store();
    let nearby = locator(&store, StubGeocoder::knowing(ADDRESS, PATIENT_ORIGIN))
        .nearby(ADDRESS)
        .await
        .unwrap();

    assert_eq!(nearby.patient_coordinate, Some(PATIENT_ORIGIN));
    assert_eq!(nearby.notice, None);
    assert_eq!(nearby.candidates.len(), 1);
    assert_eq!(nearby.candidates[0].facility.name, "UBS Centro");
    assert_eq!(nearby.candidates[0].facility.id, 1);
    assert!((nearby.candidates[0].distance_km - 2.0).abs() < 0.05);
}

#[tokio::test]
async fn unknown_address_yields_notice_and_no_candidates() {
    let store = store();
    let nearby = locator(&store, StubGeocoder::default())
        .nearby("Rua que não existe")
        .await
        .unwrap();

    assert!(nearby.candidates.is_empty());
    assert_eq!(nearby.patient_coordinate, None);
    assert_eq!(nearby.notice.as_deref(), Some(ADDRESS_NOT_FOUND_NOTICE));
}

#[tokio::test]
async fn geocoder_timeout_is_treated_as_not_found() {
    let store = store();
    let nearby = locator(&store, StubGeocoder::timing_out())
        .nearby(ADDRESS)
        .await
        .unwrap();

    assert!(nearby.candidates.is_empty());
    assert_eq!(nearby.notice.as_deref(), Some(ADDRESS_NOT_FOUND_NOTICE));
}

#[tokio::test]
async fn pending_patient_becomes_scheduled() {
    let store = store();
    let service = SchedulingService::new(store.clone());
    let maria = patient(&store, "Maria");
    let joao = patient(&store, "João");

    let pending: Vec<i32> = service.list_pending().await.unwrap().iter().map(|p| p.id).collect();
    assert_eq!(pending, vec![maria, joao]);
    assert!(service.list_scheduled().await.unwrap().is_empty());

    let nearby = locator(&store, StubGeocoder::knowing(ADDRESS, PATIENT_ORIGIN))
        .nearby(ADDRESS)
        .await
        .unwrap();
    let appointment = service
        .schedule_appointment(maria, &form(Some("1")), &nearby)
        .await
        .unwrap();
    assert_eq!(appointment.patient_id, maria);
    assert_eq!(appointment.facility_id, 1);
    assert_eq!(appointment.urgency, "média");
    assert_eq!(appointment.scheduled_at.to_string(), "2026-10-20 09:30:00");

    let pending: Vec<i32> = service.list_pending().await.unwrap().iter().map(|p| p.id).collect();
    assert_eq!(pending, vec![joao]);
    let scheduled = service.list_scheduled().await.unwrap();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].patient.id, maria);
    assert_eq!(scheduled[0].facility_name, "UBS Centro");

    let confirmation = service.latest_confirmation(maria, 1).await.unwrap();
    assert_eq!(confirmation.appointment, appointment);
    assert_eq!(confirmation.facility.name, "UBS Centro");
}

#[tokio::test]
async fn missing_facility_is_rejected_without_writing() {
    let store = store();
    let service = SchedulingService::new(store.clone());
    let maria = patient(&store, "Maria");
    let nearby = locator(&store, StubGeocoder::knowing(ADDRESS, PATIENT_ORIGIN))
        .nearby(ADDRESS)
        .await
        .unwrap();

    for facility in [None, Some(""), Some("  ")] {
        let result = service
            .schedule_appointment(maria, &form(facility), &nearby)
            .await;
        assert!(matches!(
            result,
            Err(SchedulingError::Validation(ValidationError::MissingFacility))
        ));
    }
    assert!(store.appointments().is_empty());
    assert_eq!(service.list_pending().await.unwrap().len(), 1);
}

#[tokio::test]
async fn facility_outside_candidates_is_rejected() {
    let store = store();
    let service = SchedulingService::new(store.clone());
    let maria = patient(&store, "Maria");
    let nearby = locator(&store, StubGeocoder::knowing(ADDRESS, PATIENT_ORIGIN))
        .nearby(ADDRESS)
        .await
        .unwrap();

    // "AMA Sul" is eligible by name but 8 km away
    let result = service
        .schedule_appointment(maria, &form(Some("3")), &nearby)
        .await;
    assert!(matches!(
        result,
        Err(SchedulingError::Validation(ValidationError::FacilityNotNearby(3)))
    ));
    assert!(store.appointments().is_empty());
}

#[tokio::test]
async fn unknown_patient_is_not_found() {
    let store = store();
    let service = SchedulingService::new(store.clone());
    let nearby = locator(&store, StubGeocoder::knowing(ADDRESS, PATIENT_ORIGIN))
        .nearby(ADDRESS)
        .await
        .unwrap();

    let result = service
        .schedule_appointment(404, &form(Some("1")), &nearby)
        .await;
    assert!(matches!(result, Err(SchedulingError::PatientNotFound(404))));
}

#[tokio::test]
async fn confirmation_is_absent_before_scheduling() {
    let store = store();
    let service = SchedulingService::new(store.clone());
    let maria = patient(&store, "Maria");

    let result = service.latest_confirmation(maria, 1).await;
    assert!(matches!(
        result,
        Err(SchedulingError::ConfirmationNotFound {
            patient_id,
            facility_id: 1
        }) if patient_id == maria
    ));
}

#[tokio::test]
async fn confirmation_returns_most_recent_appointment_for_pair() {
    let store = store();
    let service = SchedulingService::new(store.clone());
    let maria = patient(&store, "Maria");
    let nearby = locator(&store, StubGeocoder::knowing(ADDRESS, PATIENT_ORIGIN))
        .nearby(ADDRESS)
        .await
        .unwrap();

    let mut later = form(Some("1"));
    later.date = Some("2026-11-02".to_string());
    service
        .schedule_appointment(maria, &later, &nearby)
        .await
        .unwrap();
    service
        .schedule_appointment(maria, &form(Some("1")), &nearby)
        .await
        .unwrap();

    let confirmation = service.latest_confirmation(maria, 1).await.unwrap();
    assert_eq!(
        confirmation.appointment.scheduled_at.to_string(),
        "2026-11-02 09:30:00"
    );

    let scheduled = service.list_scheduled().await.unwrap();
    assert_eq!(scheduled.len(), 2);
    assert!(scheduled[0].scheduled_at >= scheduled[1].scheduled_at);

    let (latest, facility) = service.latest_appointment(maria).await.unwrap();
    assert_eq!(latest, confirmation.appointment);
    assert_eq!(facility.id, 1);
}
