use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::domain::Route;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("messaging webhook not configured")]
    NotConfigured,
    #[error("message client unavailable: {0}")]
    Client(String),
    #[error("message transport failed: {0}")]
    Transport(String),
    #[error("message rejected by provider (errcode {code}): {message}")]
    Rejected { code: i64, message: String },
}

/// Capability interface for delivering messages to the group channel.
/// Every failure is surfaced; nothing is retried automatically.
pub trait MessageGateway: Send + Sync {
    fn send_text(&self, content: &str) -> Result<(), DeliveryError>;
    fn send_image(&self, image_ref: &str) -> Result<(), DeliveryError>;
    fn send_markdown(&self, content: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Deserialize)]
struct WebhookResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// Enterprise-WeChat group robot. Success is the provider's `errcode == 0`;
/// a missing webhook URL is a delivery failure, not a panic.
pub struct WeComBot {
    webhook_url: Option<String>,
    client: reqwest::blocking::Client,
}

impl WeComBot {
    pub fn new(webhook_url: Option<String>) -> Result<Self, DeliveryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| DeliveryError::Client(err.to_string()))?;
        Ok(Self {
            webhook_url,
            client,
        })
    }

    fn post(&self, payload: serde_json::Value) -> Result<(), DeliveryError> {
        let url = self
            .webhook_url
            .as_deref()
            .ok_or(DeliveryError::NotConfigured)?;

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;
        let body: WebhookResponse = response
            .json()
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;

        if body.errcode == 0 {
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                code: body.errcode,
                message: body.errmsg,
            })
        }
    }
}

impl MessageGateway for WeComBot {
    fn send_text(&self, content: &str) -> Result<(), DeliveryError> {
        self.post(json!({ "msgtype": "text", "text": { "content": content } }))
    }

    fn send_image(&self, image_ref: &str) -> Result<(), DeliveryError> {
        // The robot API wants an uploaded media id; a markdown image link
        // keeps the payload self-contained as long as the ref is reachable.
        self.post(json!({
            "msgtype": "markdown",
            "markdown": { "content": format!("![海报]({image_ref})") }
        }))
    }

    fn send_markdown(&self, content: &str) -> Result<(), DeliveryError> {
        self.post(json!({ "msgtype": "markdown", "markdown": { "content": content } }))
    }
}

/// Vote-open announcement accompanying the poster.
pub fn publication_message(vote_url: &str) -> String {
    format!(
        "📢 活动投票已开启！\n\n请扫描上方二维码或点击下方链接选择活动日期：\n{vote_url}"
    )
}

/// Welcome message sent when the activity group is created.
pub fn welcome_message(route: &Route, date_label: &str) -> String {
    format!(
        "🎉 欢迎大家加入本次轻徒步活动群！\n\n\
         本次活动信息：\n\
         📍 <font color=\"warning\">路线</font>：{name}\n\
         📅 <font color=\"info\">时间</font>：{date_label}\n\
         🏃 里程：{distance}公里\n\
         ⛰️ 爬升：{elevation}米\n\
         ⏱️ 时长：{duration}小时\n\
         💰 费用：公益免费（AA制交通费）\n\n\
         ---\n\n\
         📋 常见问题快速入口：\n\
         1. 活动费用多少？\n\
         2. 需要带什么装备？\n\
         3. 集合时间和地点？\n\
         4. 活动难度如何？\n\
         5. 天气怎么样？\n\
         6. 如何报名参加？\n\n\
         <font color=\"comment\">有任何问题请直接在群里提问，机器人小助手会自动回复～</font>",
        name = route.name,
        distance = route.distance_km,
        elevation = route.elevation_m,
        duration = route.duration_hours,
    )
}

/// Announcement of the winning date once the vote closes.
pub fn vote_result_message(date_label: &str, weather: &str) -> String {
    format!(
        "🎉 投票结果公布！\n\n\
         活动日期已确定为：<font color=\"warning\">{date_label}</font>\n\
         天气预报：<font color=\"info\">{weather}</font>\n\n\
         接下来请留意群内通知，我们会在活动前发布详细安排和集合信息。\n\n\
         <font color=\"comment\">期待与大家一起出发！🚶‍♂️🚶‍♀️</font>"
    )
}

/// Gear-and-logistics reminder sent shortly before the activity.
pub fn activity_reminder(date_label: &str) -> String {
    format!(
        "📢 活动前提醒！\n\n\
         活动时间：<font color=\"warning\">{date_label}</font>\n\n\
         <font color=\"info\">集合信息</font>：\n\
         - 时间：活动前一天晚上群内通知\n\
         - 地点：待定\n\n\
         <font color=\"warning\">装备清单</font>：\n\
         ✅ 徒步鞋（防滑耐磨）\n\
         ✅ 双肩背包\n\
         ✅ 饮用水（1.5-2L）\n\
         ✅ 午餐和零食\n\
         ✅ 防晒用品\n\
         ✅ 个人常用药品\n\n\
         <font color=\"comment\">请提前做好准备，准时集合！</font>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::outing::domain::{Difficulty, RouteId};

    #[test]
    fn unconfigured_webhook_is_a_delivery_failure() {
        let bot = WeComBot::new(None).expect("client builds");
        assert!(matches!(
            bot.send_text("hello"),
            Err(DeliveryError::NotConfigured)
        ));
    }

    #[test]
    fn welcome_message_carries_the_route_facts() {
        let route = Route {
            id: RouteId(1),
            name: "东山环线·碧螺春茶园之旅".to_string(),
            distance_km: 12.5,
            elevation_m: 650.0,
            duration_hours: 5.5,
            difficulty: Difficulty::Beginner,
            hot_score: 9.2,
            tags: "风景,茶文化,轻松".to_string(),
            cover_url: String::new(),
            description: String::new(),
            location: "苏州东山".to_string(),
            source_url: String::new(),
        };

        let message = welcome_message(&route, "2025-11-01（周六）");
        assert!(message.contains("东山环线"));
        assert!(message.contains("12.5公里"));
        assert!(message.contains("2025-11-01（周六）"));
    }

    #[test]
    fn result_and_reminder_templates_carry_the_date() {
        let result = vote_result_message("2025-11-08（周六）", "多云，12-18℃");
        assert!(result.contains("2025-11-08（周六）"));
        assert!(result.contains("多云，12-18℃"));

        let reminder = activity_reminder("2025-11-08（周六）");
        assert!(reminder.contains("2025-11-08（周六）"));
        assert!(reminder.contains("装备清单"));
    }
}
