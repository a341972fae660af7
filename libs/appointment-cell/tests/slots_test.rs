mod common;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate};

use appointment_cell::models::AppointmentError;
use doctor_cell::models::Weekday;

use common::*;

#[tokio::test]
async fn range_and_slot_length_are_validated() {
    let clinic = Clinic::new().await;
    let slots = &clinic.state.slots;

    assert_matches!(
        slots.generate_slots(clinic.doctor_id, monday_date(), 0, 30, long_ago()).await,
        Err(AppointmentError::Validation(_))
    );
    assert_matches!(
        slots.generate_slots(clinic.doctor_id, monday_date(), 367, 30, long_ago()).await,
        Err(AppointmentError::Validation(_))
    );
    assert_matches!(
        slots.generate_slots(clinic.doctor_id, monday_date(), 1, 4, long_ago()).await,
        Err(AppointmentError::Validation(_))
    );
    assert!(slots.generate_slots(clinic.doctor_id, monday_date(), 366, 5, long_ago()).await.is_ok());
}

#[tokio::test]
async fn slot_length_is_capped_at_one_day() {
    let clinic = Clinic::new().await;
    let slots = &clinic.state.slots;

    assert_matches!(
        slots.generate_slots(clinic.doctor_id, monday_date(), 1, 1_441, long_ago()).await,
        Err(AppointmentError::Validation(_))
    );
    assert_matches!(
        slots.generate_slots(clinic.doctor_id, monday_date(), 1, u32::MAX, long_ago()).await,
        Err(AppointmentError::Validation(_))
    );

    // A day-long slot never fits inside a window.
    let day_long = slots.generate_slots(clinic.doctor_id, monday_date(), 7, 1_440, long_ago()).await.unwrap();
    assert_eq!(day_long.iter().count(), 0);
}

#[tokio::test]
async fn last_representable_days_produce_slots_without_overflow() {
    let clinic = Clinic::new().await;
    let all_day: Vec<_> = Weekday::ALL.iter().map(|&weekday| (weekday, hm(0, 0), hm(23, 59))).collect();
    let doctor = clinic.add_doctor(&all_day).await;
    let last_full_day = NaiveDate::MAX.pred_opt().unwrap();

    let hourly = clinic
        .state
        .slots
        .generate_slots(doctor, last_full_day, 1, 60, long_ago())
        .await
        .unwrap();
    assert_eq!(hourly.iter().count(), 23);

    let day_long = clinic
        .state
        .slots
        .generate_slots(doctor, last_full_day, 1, 1_440, long_ago())
        .await
        .unwrap();
    assert_eq!(day_long.to_vec(), Vec::new());

    assert_matches!(
        clinic.state.slots.generate_slots(doctor, NaiveDate::MAX, 1, 60, long_ago()).await,
        Err(AppointmentError::Validation(_))
    );
}

#[tokio::test]
async fn trailing_partial_slot_is_dropped() {
    let clinic = Clinic::new().await;
    let doctor = clinic.add_doctor(&[(Weekday::Mon, hm(9, 0), hm(10, 45))]).await;

    let slots = clinic
        .state
        .slots
        .generate_slots(doctor, monday_date(), 1, 30, long_ago())
        .await
        .unwrap()
        .to_vec();

    let starts: Vec<_> = slots.iter().map(|slot| slot.start_time).collect();
    assert_eq!(starts, vec![monday(9, 0), monday(9, 30), monday(10, 0)]);
    assert!(slots.iter().all(|slot| slot.end_time - slot.start_time == Duration::minutes(30)));
}

#[tokio::test]
async fn overlapping_windows_do_not_duplicate_slots() {
    let clinic = Clinic::new().await;
    let doctor = clinic
        .add_doctor(&[
            (Weekday::Mon, hm(9, 0), hm(11, 0)),
            (Weekday::Mon, hm(10, 0), hm(12, 0)),
        ])
        .await;

    let slots = clinic
        .state
        .slots
        .generate_slots(doctor, monday_date(), 1, 60, long_ago())
        .await
        .unwrap()
        .to_vec();

    let starts: Vec<_> = slots.iter().map(|slot| slot.start_time).collect();
    assert_eq!(starts, vec![monday(9, 0), monday(10, 0), monday(11, 0)]);
}

#[tokio::test]
async fn slots_ending_before_now_are_skipped() {
    let clinic = Clinic::new().await;

    let slots = clinic
        .state
        .slots
        .generate_slots(clinic.doctor_id, monday_date(), 1, 30, monday(10, 15))
        .await
        .unwrap()
        .to_vec();

    // 10:00-10:30 is still running at 10:15 and stays listed.
    assert_eq!(slots.len(), 6);
    assert_eq!(slots[0].start_time, monday(10, 0));

    let none = clinic
        .state
        .slots
        .generate_slots(clinic.doctor_id, monday_date(), 1, 30, monday(13, 0))
        .await
        .unwrap();
    assert_eq!(none.iter().count(), 0);
}

#[tokio::test]
async fn week_range_only_covers_days_with_windows() {
    let clinic = Clinic::new().await;
    let doctor = clinic
        .add_doctor(&[
            (Weekday::Mon, hm(9, 0), hm(10, 0)),
            (Weekday::Wed, hm(14, 0), hm(15, 0)),
        ])
        .await;

    let slots = clinic
        .state
        .slots
        .generate_slots(doctor, monday_date(), 7, 30, long_ago())
        .await
        .unwrap()
        .to_vec();

    let wednesday = NaiveDate::from_ymd_opt(2030, 6, 5).unwrap();
    let dates: Vec<_> = slots.iter().map(|slot| slot.start_time.date_naive()).collect();
    assert_eq!(dates, vec![monday_date(), monday_date(), wednesday, wednesday]);
    assert!(slots.windows(2).all(|pair| pair[0].start_time < pair[1].start_time));
}

#[tokio::test]
async fn range_end_is_exclusive() {
    let clinic = Clinic::new().await;

    // Starting Tuesday for six days stops before the next Monday.
    let slots = clinic
        .state
        .slots
        .generate_slots(clinic.doctor_id, tuesday_date(), 6, 30, long_ago())
        .await
        .unwrap();
    assert_eq!(slots.iter().count(), 0);

    let slots = clinic
        .state
        .slots
        .generate_slots(clinic.doctor_id, tuesday_date(), 7, 30, long_ago())
        .await
        .unwrap();
    assert_eq!(slots.iter().count(), 8);
}

#[tokio::test]
async fn doctor_without_windows_has_no_slots() {
    let clinic = Clinic::new().await;
    let doctor = clinic.add_doctor(&[]).await;

    let slots = clinic
        .state
        .slots
        .generate_slots(doctor, monday_date(), 14, 30, long_ago())
        .await
        .unwrap();
    assert_eq!(slots.iter().count(), 0);
}

#[tokio::test]
async fn schedule_can_be_iterated_repeatedly() {
    let clinic = Clinic::new().await;
    clinic.book(monday(11, 0), monday(11, 30)).await.unwrap();

    let schedule = clinic
        .state
        .slots
        .generate_slots(clinic.doctor_id, monday_date(), 7, 30, long_ago())
        .await
        .unwrap();

    let first: Vec<_> = schedule.iter().collect();
    let second: Vec<_> = (&schedule).into_iter().collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 7);

    // Bookings made after generation do not change an existing schedule.
    clinic.book(monday(9, 0), monday(9, 30)).await.unwrap();
    assert_eq!(schedule.to_vec(), first);
}
