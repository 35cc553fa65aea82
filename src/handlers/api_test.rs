/// API handler tests
#[cfg(test)]
mod api_tests {
    use axum::{
        extract::{Json, Path, Query, State},
        http::StatusCode,
    };
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crate::error::StoreError;
    use crate::handlers::api::{
        apply_rules, create_booking, delete_slot, get_rules, list_contacts, list_slots,
        submit_contact, update_booking_status, update_contact_status, AppState,
    };
    use crate::models::booking::{BookingRequest, BookingStatus, StatusUpdate};
    use crate::models::common::{AdminQueryParams, ApplyRange, DateRangeParams};
    use crate::models::contact::{ContactRequest, ContactStatus, ContactStatusUpdate};
    use crate::store::{MemoryStore, MockSlotStore, SlotStore, Stores};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn memory_state(token: Option<&str>) -> (Arc<AppState>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_default_rules());
        let state = Arc::new(AppState {
            stores: Stores::from_backend(store.clone()),
            admin_auth_token: token.map(str::to_string),
            max_apply_days: 31,
        });
        (state, store)
    }

    // Mocked slot store, memory store for everything else
    fn state_with_slots(slots: MockSlotStore) -> Arc<AppState> {
        let memory = Arc::new(MemoryStore::with_default_rules());
        Arc::new(AppState {
            stores: Stores {
                slots: Arc::new(slots),
                bookings: memory.clone(),
                contacts: memory.clone(),
                rules: memory,
            },
            admin_auth_token: None,
            max_apply_days: 31,
        })
    }

    // State whose slot store always fails
    fn failing_state() -> Arc<AppState> {
        let mut slots = MockSlotStore::new();
        slots
            .expect_list()
            .returning(|_, _| Err(StoreError::Unavailable("disk full".to_string())));
        slots
            .expect_reserve()
            .returning(|_, _| Err(StoreError::Unavailable("disk full".to_string())));
        state_with_slots(slots)
    }

    fn booking_request() -> BookingRequest {
        BookingRequest {
            date: date(2025, 6, 2),
            time: "13:00".to_string(),
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            phone: None,
            message: None,
        }
    }

    #[tokio::test]
    async fn test_list_slots_filters_range() {
        let (state, store) = memory_state(None);
        store.insert(date(2025, 6, 2), "13:00", true).unwrap();
        store.insert(date(2025, 6, 3), "11:00", true).unwrap();

        let Json(slots) = list_slots(
            State(state),
            Query(DateRangeParams {
                start_date: Some(date(2025, 6, 3)),
                end_date: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].time, "11:00");
    }

    #[tokio::test]
    async fn test_store_failure_maps_to_internal_error() {
        let state = failing_state();

        let result = list_slots(State(state.clone()), Query(DateRangeParams::default())).await;
        assert_eq!(result.unwrap_err(), StatusCode::INTERNAL_SERVER_ERROR);

        let result = create_booking(State(state), Json(booking_request())).await;
        assert_eq!(result.unwrap_err(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_create_booking_statuses() {
        let (state, store) = memory_state(None);

        let result = create_booking(State(state.clone()), Json(booking_request())).await;
        assert_eq!(result.unwrap_err(), StatusCode::CONFLICT);

        store.insert(date(2025, 6, 2), "13:00", true).unwrap();
        let (status, Json(booking)) = create_booking(State(state), Json(booking_request()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_admin_token_checked() {
        let (state, _store) = memory_state(Some("secret"));

        let result = get_rules(State(state.clone()), Query(AdminQueryParams { auth: None })).await;
        assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);

        let result = get_rules(
            State(state),
            Query(AdminQueryParams {
                auth: Some("secret".to_string()),
            }),
        )
        .await;
        assert_eq!(result.unwrap().0.len(), 2);
    }

    #[tokio::test]
    async fn test_apply_rules_handler() {
        let (state, store) = memory_state(None);

        let range = ApplyRange {
            start_date: date(2025, 6, 1),
            end_date: date(2025, 6, 7),
        };
        let Json(report) = apply_rules(State(state.clone()), Query(AdminQueryParams::default()), Json(range))
            .await
            .unwrap();
        assert_eq!(report.created, 8);
        assert_eq!(store.list(None, None).unwrap().len(), 8);

        let too_long = ApplyRange {
            start_date: date(2025, 6, 1),
            end_date: date(2025, 8, 1),
        };
        let result = apply_rules(State(state), Query(AdminQueryParams::default()), Json(too_long)).await;
        assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_unknown_slot() {
        let (state, _store) = memory_state(None);
        let result = delete_slot(
            State(state),
            Path("2025-06-02-13:00".to_string()),
            Query(AdminQueryParams::default()),
        )
        .await;
        assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reactivating_taken_booking_conflicts() {
        let (state, store) = memory_state(None);
        store.insert(date(2025, 6, 2), "13:00", true).unwrap();

        let (_, Json(first)) = create_booking(State(state.clone()), Json(booking_request()))
            .await
            .unwrap();
        update_booking_status(
            State(state.clone()),
            Path(first.id.clone()),
            Query(AdminQueryParams::default()),
            Json(StatusUpdate {
                status: BookingStatus::Cancelled,
            }),
        )
        .await
        .unwrap();
        create_booking(State(state.clone()), Json(booking_request()))
            .await
            .unwrap();

        let result = update_booking_status(
            State(state),
            Path(first.id),
            Query(AdminQueryParams::default()),
            Json(StatusUpdate {
                status: BookingStatus::Pending,
            }),
        )
        .await;
        assert_eq!(result.unwrap_err(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_contact_handlers() {
        let (state, _store) = memory_state(Some("secret"));

        let request = ContactRequest {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            message: "Please call me back".to_string(),
        };
        let (status, Json(submission)) = submit_contact(State(state.clone()), Json(request))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(submission.status, ContactStatus::New);

        let result = list_contacts(State(state.clone()), Query(AdminQueryParams::default())).await;
        assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);

        let admin = || AdminQueryParams {
            auth: Some("secret".to_string()),
        };
        let Json(updated) = update_contact_status(
            State(state.clone()),
            Path(submission.id.clone()),
            Query(admin()),
            Json(ContactStatusUpdate {
                status: ContactStatus::Replied,
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.status, ContactStatus::Replied);

        let Json(listed) = list_contacts(State(state.clone()), Query(admin())).await.unwrap();
        assert_eq!(listed, vec![updated]);

        let result = update_contact_status(
            State(state),
            Path("missing".to_string()),
            Query(admin()),
            Json(ContactStatusUpdate {
                status: ContactStatus::Read,
            }),
        )
        .await;
        assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_slow_store_does_not_block_runtime() {
        let mut slots = MockSlotStore::new();
        slots.expect_list().returning(|_, _| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(Vec::new())
        });
        let state = state_with_slots(slots);

        let started = Instant::now();
        let ticker = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Instant::now()
        });
        let (result, ticked) = tokio::join!(
            list_slots(State(state), Query(DateRangeParams::default())),
            ticker
        );

        assert!(result.is_ok());
        // The timer fired while the store call was still running
        assert!(ticked.unwrap() - started < Duration::from_millis(250));
    }
}
