//! Property tests for query descriptor merging.
//!
//! 1. Any patch that moves a non-page field leaves the descriptor on page 0.
//! 2. A page-only patch never touches filters or sort.
//! 3. `apply` reports a change iff the descriptor differs afterwards.
//! 4. Encoded query pairs always carry pagination and sort, and a filter
//!    key only when that filter is set.

use chrono::NaiveDate;
use proptest::prelude::*;
use taskdesk_proto::query::{
    PageQuery, SortDirection, TaskQuery, TaskQueryPatch, TaskSortField, UserQuery, UserQueryPatch,
    UserSortField,
};
use taskdesk_proto::task::{TaskPriority, TaskStatus};

fn arb_status() -> impl Strategy<Value = Option<TaskStatus>> {
    prop::option::of(prop::sample::select(TaskStatus::ALL.to_vec()))
}

fn arb_priority() -> impl Strategy<Value = Option<TaskPriority>> {
    prop::option::of(prop::sample::select(TaskPriority::ALL.to_vec()))
}

fn arb_due_date() -> impl Strategy<Value = Option<NaiveDate>> {
    prop::option::of((0u32..60).prop_filter_map("valid date", |offset| {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .and_then(|d| d.checked_add_days(chrono::Days::new(u64::from(offset))))
    }))
}

fn arb_task_sort() -> impl Strategy<Value = TaskSortField> {
    prop::sample::select(vec![
        TaskSortField::Id,
        TaskSortField::Title,
        TaskSortField::Status,
        TaskSortField::Priority,
        TaskSortField::DueDate,
    ])
}

fn arb_direction() -> impl Strategy<Value = SortDirection> {
    prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
}

fn arb_task_query() -> impl Strategy<Value = TaskQuery> {
    (
        arb_status(),
        arb_priority(),
        arb_due_date(),
        0u32..20,
        prop::sample::select(vec![5u32, 10, 20]),
        arb_task_sort(),
        arb_direction(),
    )
        .prop_map(
            |(status, priority, due_date, page, size, sort_by, sort_dir)| TaskQuery {
                status,
                priority,
                due_date,
                page,
                size,
                sort_by,
                sort_dir,
            },
        )
}

fn arb_task_patch() -> impl Strategy<Value = TaskQueryPatch> {
    (
        prop::option::of(arb_status()),
        prop::option::of(arb_priority()),
        prop::option::of(arb_due_date()),
        prop::option::of(0u32..20),
        prop::option::of(prop::sample::select(vec![5u32, 10, 20])),
        prop::option::of(arb_task_sort()),
        prop::option::of(arb_direction()),
    )
        .prop_map(
            |(status, priority, due_date, page, size, sort_by, sort_dir)| TaskQueryPatch {
                status,
                priority,
                due_date,
                page,
                size,
                sort_by,
                sort_dir,
            },
        )
}

fn same_non_page_fields(a: &TaskQuery, b: &TaskQuery) -> bool {
    a.status == b.status
        && a.priority == b.priority
        && a.due_date == b.due_date
        && a.size == b.size
        && a.sort_by == b.sort_by
        && a.sort_dir == b.sort_dir
}

proptest! {
    #[test]
    fn non_page_change_resets_page(mut query in arb_task_query(), patch in arb_task_patch()) {
        let before = query.clone();
        query.apply(&patch);
        if !same_non_page_fields(&before, &query) {
            prop_assert_eq!(query.page, 0);
        }
    }

    #[test]
    fn page_only_patch_preserves_filters(mut query in arb_task_query(), page in 0u32..50) {
        let before = query.clone();
        query.apply(&TaskQueryPatch::default().page(page));
        prop_assert!(same_non_page_fields(&before, &query));
        prop_assert_eq!(query.page, page);
    }

    #[test]
    fn apply_reports_change_exactly(mut query in arb_task_query(), patch in arb_task_patch()) {
        let before = query.clone();
        let changed = query.apply(&patch);
        prop_assert_eq!(changed, before != query);
    }

    #[test]
    fn query_pairs_reflect_filters(query in arb_task_query()) {
        let pairs = query.query_pairs();
        let has = |key: &str| pairs.iter().any(|(k, _)| *k == key);
        prop_assert!(has("page") && has("size") && has("sortBy") && has("sortDir"));
        prop_assert_eq!(has("status"), query.status.is_some());
        prop_assert_eq!(has("priority"), query.priority.is_some());
        prop_assert_eq!(has("dueDate"), query.due_date.is_some());
    }

    #[test]
    fn user_sort_change_resets_page(
        page in 1u32..20,
        sort_by in prop::sample::select(vec![UserSortField::Id, UserSortField::Email, UserSortField::Role]),
        sort_dir in arb_direction(),
    ) {
        let mut query = UserQuery { page, ..UserQuery::default() };
        let before = query.clone();
        query.apply(&UserQueryPatch::default().sort(sort_by, sort_dir));
        if query.sort_by != before.sort_by || query.sort_dir != before.sort_dir {
            prop_assert_eq!(query.page, 0);
        } else {
            prop_assert_eq!(query.page, page);
        }
    }
}
