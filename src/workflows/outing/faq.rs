use super::store::{OutingStore, StoreError};

/// Starter question bank for the group assistant.
const DEFAULT_FAQ: [(&str, &str, &str); 15] = [
    (
        "活动费用多少？",
        "本次活动为公益性质，不收取服务费，仅收取AA制交通费用，具体金额在活动群内通知。",
        "费用",
    ),
    (
        "需要带什么装备？",
        "请准备好徒步鞋、双肩背包、饮用水（1.5-2L）、午餐、防晒用品等。详细装备清单稍后发布。",
        "装备",
    ),
    (
        "集合时间和地点？",
        "集合时间和地点会在活动前一天晚上群内通知，请关注群消息。",
        "集合",
    ),
    (
        "活动难度如何？",
        "本次路线为轻徒步，适合新手参与，全程有领队带领。",
        "难度",
    ),
    (
        "天气怎么样？",
        "活动前3天会发布天气预报，请根据天气准备相应装备。",
        "天气",
    ),
    (
        "如何报名参加？",
        "报名链接将在群内发布，点击链接填写信息即可报名。",
        "报名",
    ),
    ("报名截止时间？", "报名截止时间为活动前2天中午12点。", "报名"),
    ("可以带朋友吗？", "可以，请让朋友扫码进群并单独报名。", "报名"),
    (
        "可以取消报名吗？",
        "可以，请在活动前2天联系组织者取消。",
        "报名",
    ),
    ("有保险吗？", "活动会为每位参与者购买户外运动保险。", "安全"),
    (
        "如果中途放弃怎么办？",
        "请告知领队，在安全地点等待或自行下撤。",
        "安全",
    ),
    ("紧急联系方式？", "领队电话：[待定]，医疗救援：120", "安全"),
    ("需要准备午餐吗？", "需要，请自带午餐和适量零食。", "装备"),
    ("有厕所吗？", "路线途中可能有厕所，建议自备湿纸巾。", "其他"),
    ("可以带宠物吗？", "为了安全和环保，不建议带宠物。", "其他"),
];

/// Load the starter question bank unless the store already has entries.
pub fn init_faq(store: &dyn OutingStore) -> Result<usize, StoreError> {
    if !store.all_faq()?.is_empty() {
        return Ok(0);
    }
    for (question, answer, category) in DEFAULT_FAQ {
        store.insert_faq(question, answer, category)?;
    }
    Ok(DEFAULT_FAQ.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::outing::store::MemoryStore;

    #[test]
    fn init_is_idempotent() {
        let store = MemoryStore::new();
        assert_eq!(init_faq(&store).expect("first init"), 15);
        assert_eq!(init_faq(&store).expect("second init"), 0);
        assert_eq!(store.all_faq().expect("faq list").len(), 15);
    }

    #[test]
    fn lookup_matches_substrings_and_counts_clicks() {
        let store = MemoryStore::new();
        init_faq(&store).expect("init");

        let hit = store.lookup_faq("装备").expect("lookup").expect("hit");
        assert!(hit.question.contains("装备"));
        assert_eq!(hit.click_count, 1);

        let hit = store.lookup_faq("装备").expect("lookup").expect("hit");
        assert_eq!(hit.click_count, 2);

        assert!(store.lookup_faq("缆车").expect("lookup").is_none());
    }
}
