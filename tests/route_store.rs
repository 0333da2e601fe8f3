use chrono::NaiveDate;
use trailplan::workflows::outing::discovery::seed_catalog;
use trailplan::workflows::outing::domain::{
    ActivityDraft, ActivityId, ActivityStatus, Difficulty, RouteDraft, VoteOptionDraft,
};
use trailplan::workflows::outing::faq::init_faq;
use trailplan::workflows::outing::store::{MemoryStore, OutingStore, RouteFilter};
use trailplan::workflows::outing::tally;

fn draft(name: &str, distance: f64, elevation: f64, duration: f64, hot: f64) -> RouteDraft {
    RouteDraft {
        name: name.to_string(),
        distance_km: distance,
        elevation_m: elevation,
        duration_hours: duration,
        difficulty: Difficulty::Beginner,
        hot_score: hot,
        tags: "风景,轻松".to_string(),
        cover_url: String::new(),
        description: String::new(),
        location: "苏州测试".to_string(),
        source_url: String::new(),
    }
}

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    seed_catalog(&store).expect("seeding succeeds");
    store
}

fn activity_with_options(store: &MemoryStore, counts: &[u32]) -> ActivityId {
    let route_id = store
        .list_routes(&RouteFilter::default(), 1, 0)
        .expect("routes listed")
        .first()
        .expect("catalog seeded")
        .id;
    let activity_id = store
        .insert_activity(ActivityDraft {
            route_id,
            name: "测试活动".to_string(),
            activity_date: None,
            status: ActivityStatus::Planning,
            poster_path: None,
            vote_url: None,
            vote_deadline: None,
            vote_month: Some("2025-11".to_string()),
            selected_date: None,
        })
        .expect("activity inserted");

    let drafts: Vec<VoteOptionDraft> = counts
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let date = NaiveDate::from_ymd_opt(2025, 11, 1 + i as u32).expect("valid date");
            VoteOptionDraft {
                date,
                label: format!("{date}（周六）"),
                weather: "晴，10-16℃".to_string(),
            }
        })
        .collect();
    let ids = store
        .insert_vote_options(activity_id, &drafts)
        .expect("options inserted");
    for (id, count) in ids.iter().zip(counts) {
        store.update_vote_count(*id, *count).expect("count updated");
    }
    activity_id
}

#[test]
fn filters_bound_every_returned_route() {
    let store = MemoryStore::new();
    store.insert_route(draft("短线", 5.0, 100.0, 2.0, 5.0)).expect("insert");
    store.insert_route(draft("超距", 18.0, 100.0, 2.0, 9.0)).expect("insert");
    store.insert_route(draft("超爬升", 5.0, 900.0, 2.0, 9.0)).expect("insert");
    store.insert_route(draft("超时长", 5.0, 100.0, 8.0, 9.0)).expect("insert");

    let filter = RouteFilter::default();
    let routes = store.list_routes(&filter, 10, 0).expect("listing succeeds");
    assert_eq!(routes.len(), 1);
    assert!(routes.iter().all(|r| {
        r.distance_km <= filter.max_distance_km
            && r.elevation_m <= filter.max_elevation_m
            && r.duration_hours <= filter.max_duration_hours
    }));
    assert_eq!(store.count_routes(&filter).expect("count succeeds"), 1);
}

#[test]
fn listing_is_ordered_by_hot_score_descending() {
    let store = seeded_store();
    let routes = store
        .list_routes(&RouteFilter::for_location("苏州"), 100, 0)
        .expect("listing succeeds");

    assert!(routes
        .windows(2)
        .all(|pair| pair[0].hot_score >= pair[1].hot_score));
    assert_eq!(routes[0].name, "东山环线·碧螺春茶园之旅");
}

#[test]
fn pagination_concatenation_matches_a_single_larger_page() {
    let store = seeded_store();
    let filter = RouteFilter::for_location("苏州");

    let page_one = store.list_routes(&filter, 3, 0).expect("page one");
    let page_two = store.list_routes(&filter, 3, 3).expect("page two");
    let combined: Vec<_> = page_one
        .iter()
        .chain(page_two.iter())
        .map(|r| r.id)
        .collect();

    let larger: Vec<_> = store
        .list_routes(&filter, 6, 0)
        .expect("single page")
        .iter()
        .map(|r| r.id)
        .collect();

    assert_eq!(combined, larger);
}

#[test]
fn location_filter_matches_substrings() {
    let store = seeded_store();
    let shanghai = store
        .list_routes(&RouteFilter::for_location("上海"), 100, 0)
        .expect("listing succeeds");
    assert_eq!(shanghai.len(), 6);
    assert!(shanghai.iter().all(|r| r.location.contains("上海")));
}

#[test]
fn max_vote_option_breaks_ties_on_the_lowest_id() {
    let store = seeded_store();
    let activity_id = activity_with_options(&store, &[4, 4, 2, 4]);

    for _ in 0..10 {
        let winner = store
            .max_vote_option(activity_id)
            .expect("tally succeeds")
            .expect("winner present");
        assert_eq!(winner.vote_count, 4);
        assert_eq!(
            winner.date,
            NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid date")
        );
    }

    let options = store
        .list_vote_options(activity_id)
        .expect("options listed");
    assert_eq!(
        tally::winner(&options).map(|o| o.id),
        store
            .max_vote_option(activity_id)
            .expect("tally succeeds")
            .map(|o| o.id)
    );
}

#[test]
fn reinserting_vote_options_replaces_the_previous_set() {
    let store = seeded_store();
    let activity_id = activity_with_options(&store, &[1, 2, 3]);

    let replacement: Vec<VoteOptionDraft> = (0..2)
        .map(|i| {
            let date = NaiveDate::from_ymd_opt(2025, 12, 6 + i * 7).expect("valid date");
            VoteOptionDraft {
                date,
                label: format!("{date}（周六）"),
                weather: "小雨，6-10℃".to_string(),
            }
        })
        .collect();
    store
        .insert_vote_options(activity_id, &replacement)
        .expect("replacement inserted");

    let options = store
        .list_vote_options(activity_id)
        .expect("options listed");
    assert_eq!(options.len(), 2);
    assert!(options.iter().all(|o| o.vote_count == 0));
}

#[test]
fn activity_patches_only_touch_named_fields() {
    let store = seeded_store();
    activity_with_options(&store, &[1]);
    let activity = store
        .latest_activity()
        .expect("lookup succeeds")
        .expect("activity present");

    store
        .update_activity(
            activity.id,
            trailplan::workflows::outing::domain::ActivityPatch {
                status: Some(ActivityStatus::Recruiting),
                ..Default::default()
            },
        )
        .expect("patch applies");

    let updated = store
        .get_activity(activity.id)
        .expect("lookup succeeds")
        .expect("activity present");
    assert_eq!(updated.status, ActivityStatus::Recruiting);
    assert_eq!(updated.vote_month, activity.vote_month);
    assert_eq!(updated.name, activity.name);
}

#[test]
fn faq_lookup_increments_clicks_and_orders_by_popularity() {
    let store = MemoryStore::new();
    init_faq(&store).expect("faq seeded");

    store.lookup_faq("保险").expect("lookup").expect("hit");
    store.lookup_faq("保险").expect("lookup").expect("hit");
    store.lookup_faq("装备").expect("lookup").expect("hit");

    let ranked = store.all_faq().expect("faq listed");
    assert_eq!(ranked[0].question, "有保险吗？");
    assert_eq!(ranked[0].click_count, 2);
}

#[test]
fn duplicate_member_registration_is_a_no_op() {
    let store = MemoryStore::new();

    let first = store
        .register_member("wx_1001", Some("小王"), "participant")
        .expect("registration succeeds");
    assert!(first.is_some());

    let second = store
        .register_member("wx_1001", Some("小王"), "participant")
        .expect("duplicate tolerated");
    assert!(second.is_none());

    let member = store
        .get_member("wx_1001")
        .expect("lookup succeeds")
        .expect("member present");
    assert_eq!(member.name.as_deref(), Some("小王"));
}

#[test]
fn recent_messages_come_back_newest_first() {
    let store = MemoryStore::new();
    for i in 0..5 {
        store
            .insert_message("group-1", "wx_1001", &format!("消息{i}"), false)
            .expect("message inserted");
    }
    store
        .insert_message("group-2", "wx_1002", "别的群", false)
        .expect("message inserted");

    let recent = store
        .recent_messages("group-1", 3)
        .expect("listing succeeds");
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].text, "消息4");
    assert!(recent.iter().all(|m| m.group_chat_id == "group-1"));
}
