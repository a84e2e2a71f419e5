//! 课程注册名单缓存
//!
//! 每门课程的注册名单在进程内只拉取一次。

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// 注册名单中的一个人
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrolledPerson {
    /// 目录用户 ID
    pub remote_id: String,
    /// 外部学号（带前缀）
    pub sis_user_id: Option<String>,
}

impl EnrolledPerson {
    /// 从注册记录 JSON 中取出用户信息
    ///
    /// 优先读 `user.id`，缺失时退回顶层 `user_id`。
    pub fn from_enrollment(enrollment: &JsonValue) -> Option<Self> {
        let user = enrollment.get("user");
        let remote_id = user
            .and_then(|u| u.get("id"))
            .or_else(|| enrollment.get("user_id"))
            .and_then(id_to_string)?;
        let sis_user_id = user
            .and_then(|u| u.get("sis_user_id"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Some(Self {
            remote_id,
            sis_user_id,
        })
    }
}

fn id_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// 按课程缓存的注册名单
///
/// 生命周期为整个进程，只能通过 `invalidate` / `clear` 显式失效。
#[derive(Debug, Default)]
pub struct EnrollmentCache {
    entries: Mutex<HashMap<String, Arc<Vec<EnrolledPerson>>>>,
}

impl EnrollmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Vec<EnrolledPerson>>>> {
        // 单线程使用，中毒时直接沿用内部数据
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, course_id: &str) -> Option<Arc<Vec<EnrolledPerson>>> {
        self.lock().get(course_id).cloned()
    }

    pub fn store(&self, course_id: &str, people: Vec<EnrolledPerson>) -> Arc<Vec<EnrolledPerson>> {
        let people = Arc::new(people);
        self.lock().insert(course_id.to_string(), people.clone());
        people
    }

    /// 使某门课程的缓存失效，返回是否原本有缓存
    pub fn invalidate(&self, course_id: &str) -> bool {
        self.lock().remove(course_id).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
