use chrono::{Duration, Weekday};

use super::common::*;
use crate::allocations::domain::{AllocationError, SlotExclusion};
use crate::allocations::service::AllocationServiceError;
use crate::domain::{DayOfWeekSet, TimeSlot};
use crate::repository::RepositoryError;

fn exclusion(days: &[Weekday], time_slot: TimeSlot) -> SlotExclusion {
    SlotExclusion {
        week_number: 1,
        time_slot,
        days: DayOfWeekSet::from_days(days),
        // The service pins this to the effective date.
        start_date: today() - Duration::days(365),
        end_date: None,
    }
}

#[test]
fn exclusions_matching_a_slot_are_accepted_and_pinned() {
    let fixture = fixture();
    fixture.schedules.seed(weekday_schedule());
    let allocation = active_allocation(1);
    fixture.allocations.seed(allocation.clone());

    let updated = fixture
        .service
        .update_exclusions(
            allocation.id,
            vec![exclusion(&[Weekday::Mon], TimeSlot::Am)],
            today(),
        )
        .expect("exclusions accepted");

    assert_eq!(updated.exclusions.len(), 1);
    assert_eq!(updated.exclusions[0].start_date, today());
}

#[test]
fn replacement_is_not_a_merge() {
    let fixture = fixture();
    fixture.schedules.seed(weekday_schedule());
    let allocation = active_allocation(2);
    fixture.allocations.seed(allocation.clone());

    fixture
        .service
        .update_exclusions(
            allocation.id,
            vec![
                exclusion(&[Weekday::Mon], TimeSlot::Am),
                exclusion(&[Weekday::Wed], TimeSlot::Am),
            ],
            today(),
        )
        .expect("first set accepted");

    let updated = fixture
        .service
        .update_exclusions(
            allocation.id,
            vec![exclusion(&[Weekday::Fri], TimeSlot::Am)],
            today(),
        )
        .expect("second set accepted");

    assert_eq!(updated.exclusions.len(), 1);
    assert!(updated.exclusions[0].days.contains(Weekday::Fri));

    let empty = fixture
        .service
        .update_exclusions(allocation.id, Vec::new(), today())
        .expect("empty set accepted");
    assert!(empty.exclusions.is_empty());
}

#[test]
fn exclusion_with_no_matching_slot_names_the_offender() {
    let fixture = fixture();
    fixture.schedules.seed(weekday_schedule());
    let allocation = active_allocation(3);
    fixture.allocations.seed(allocation.clone());

    // The schedule only runs AM sessions.
    match fixture.service.update_exclusions(
        allocation.id,
        vec![exclusion(&[Weekday::Mon], TimeSlot::Pm)],
        today(),
    ) {
        Err(AllocationServiceError::Domain(AllocationError::NoMatchingSlot {
            week: 1,
            time_slot: "PM",
        })) => {}
        other => panic!("expected no-matching-slot rejection, got {other:?}"),
    }
}

#[test]
fn excluded_days_must_be_a_subset_of_the_slot_days() {
    let fixture = fixture();
    fixture.schedules.seed(weekday_schedule());
    let allocation = active_allocation(4);
    fixture.allocations.seed(allocation.clone());

    // Tuesday is not one of the slot's days.
    let result = fixture.service.update_exclusions(
        allocation.id,
        vec![exclusion(&[Weekday::Mon, Weekday::Tue], TimeSlot::Am)],
        today(),
    );
    assert!(matches!(
        result,
        Err(AllocationServiceError::Domain(
            AllocationError::NoMatchingSlot { .. }
        ))
    ));
}

#[test]
fn unknown_allocation_is_a_not_found_error() {
    let fixture = fixture();
    fixture.schedules.seed(weekday_schedule());

    match fixture.service.update_exclusions(
        crate::domain::AllocationId(99),
        Vec::new(),
        today(),
    ) {
        Err(AllocationServiceError::Repository(RepositoryError::NotFound)) => {}
        other => panic!("expected not-found error, got {other:?}"),
    }
}
