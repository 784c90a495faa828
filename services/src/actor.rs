//! The explicit actor descriptor passed into every lifecycle operation.
//!
//! There is no ambient "current user": whoever calls the engine states who is
//! acting, and the state machine checks that descriptor against the lock and
//! override rules.

use grading::visibility::Audience;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Tutor,
    Instructor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn student(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Student,
        }
    }

    pub fn tutor(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Tutor,
        }
    }

    pub fn instructor(user_id: i64) -> Self {
        Self {
            user_id,
            role: Role::Instructor,
        }
    }

    pub fn is_instructor(&self) -> bool {
        self.role == Role::Instructor
    }

    /// Tutors and instructors may assess.
    pub fn is_staff(&self) -> bool {
        self.role != Role::Student
    }

    pub fn audience(&self) -> Audience {
        if self.is_staff() {
            Audience::Staff
        } else {
            Audience::Student
        }
    }
}
