//! Chat rooms and the room directory.
//!
//! A room is bound to exactly one student/alumni pair and is created by the
//! backend when a mentoring request is accepted. The client only reads it,
//! except for zeroing its unread count after a mark-read acknowledgment.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::datetime::parse_server_time;

/// Role of a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Student looking for a mentor.
    Student,
    /// Alumni acting as mentor.
    Alumni,
    /// Administrator.
    Admin,
    /// Any role this client does not know.
    #[serde(other)]
    Unknown,
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// User id.
    pub id: i64,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Full name.
    #[serde(default)]
    pub full_name: String,
    /// Role.
    pub role: Role,
}

impl CurrentUser {
    /// Name to show for this user.
    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }
}

/// A chat room as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Room id.
    pub id: i64,
    /// Room name.
    #[serde(default)]
    pub room_name: String,
    /// Student's user id.
    pub student_id: i64,
    /// Student's display name.
    #[serde(default)]
    pub student_name: String,
    /// Alumni's user id.
    pub alumni_id: i64,
    /// Alumni's display name.
    #[serde(default)]
    pub alumni_name: String,
    /// Creation timestamp as sent by the server.
    #[serde(default)]
    pub created_at: String,
    /// Last message timestamp as sent by the server (empty if none).
    #[serde(default)]
    pub last_message_at: String,
    /// Whether the room is active.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Messages not yet read by the signed-in user.
    #[serde(default)]
    pub unread_count: i64,
}

fn default_active() -> bool {
    true
}

impl Room {
    /// Name of the other participant from the viewpoint of `role`.
    pub fn partner_name(&self, role: Role) -> &str {
        let (name, fallback) = match role {
            Role::Student => (&self.alumni_name, "Alumni"),
            Role::Alumni | Role::Admin => (&self.student_name, "Student"),
            Role::Unknown => (&self.room_name, "Chat"),
        };
        if name.is_empty() {
            fallback
        } else {
            name
        }
    }

    /// Label of the other participant's role.
    pub fn partner_role(&self, role: Role) -> &'static str {
        match role {
            Role::Student => "Alumni",
            Role::Alumni | Role::Admin => "Student",
            Role::Unknown => "",
        }
    }

    /// Time of the last message, if any.
    pub fn last_activity(&self, timezone: &str) -> Option<DateTime<Utc>> {
        parse_server_time(&self.last_message_at, timezone)
    }

    /// Whether the user takes part in this room.
    pub fn is_participant(&self, user_id: i64) -> bool {
        self.student_id == user_id || self.alumni_id == user_id
    }
}

/// Rooms of the signed-in user.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    user: Option<CurrentUser>,
    rooms: Vec<Room>,
}

impl RoomDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signed-in user, once loaded.
    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    /// Id of the signed-in user, once loaded.
    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    /// Role used to pick partner names.
    pub fn role(&self) -> Role {
        self.user.as_ref().map_or(Role::Unknown, |u| u.role)
    }

    /// Set the signed-in user.
    pub fn set_user(&mut self, user: Option<CurrentUser>) {
        self.user = user;
    }

    /// Replace the room list.
    pub fn replace_rooms(&mut self, rooms: Vec<Room>) {
        self.rooms = rooms;
    }

    /// All rooms in server order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Look up a room.
    pub fn get(&self, room_id: i64) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    /// Partner name for a room from the signed-in user's viewpoint.
    pub fn partner_name(&self, room_id: i64) -> Option<&str> {
        let role = self.role();
        self.get(room_id).map(|r| r.partner_name(role))
    }

    /// Zero a room's unread count after the server acknowledged mark-read.
    ///
    /// Returns false if the room is unknown.
    pub fn mark_read(&mut self, room_id: i64) -> bool {
        match self.rooms.iter_mut().find(|r| r.id == room_id) {
            Some(room) => {
                room.unread_count = 0;
                true
            }
            None => false,
        }
    }

    /// Sum of unread counts over all rooms.
    pub fn total_unread(&self) -> i64 {
        self.rooms.iter().map(|r| r.unread_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: i64, unread: i64) -> Room {
        Room {
            id,
            room_name: format!("Mentorship {id}"),
            student_id: 10,
            student_name: "Lerato Mokoena".to_string(),
            alumni_id: 20,
            alumni_name: "Sipho Dlamini".to_string(),
            created_at: "2024-03-01T09:00:00".to_string(),
            last_message_at: String::new(),
            is_active: true,
            unread_count: unread,
        }
    }

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: 10,
            email: "lerato@example.org".to_string(),
            full_name: "Lerato Mokoena".to_string(),
            role,
        }
    }

    #[test]
    fn test_deserialize_room() {
        let json = r#"{
            "id": 7,
            "roomName": "Chat: Lerato & Sipho",
            "studentId": 10,
            "studentName": "Lerato Mokoena",
            "alumniId": 20,
            "alumniName": "Sipho Dlamini",
            "createdAt": "2024-03-01T09:00:00.123",
            "lastMessageAt": "",
            "isActive": true,
            "unreadCount": 3
        }"#;
        let room: Room = serde_json::from_str(json).unwrap();
        assert_eq!(room.id, 7);
        assert_eq!(room.unread_count, 3);
        assert_eq!(room.last_activity("UTC"), None);
    }

    #[test]
    fn test_deserialize_user_with_unknown_role() {
        let json = r#"{"id": 3, "email": "x@example.org", "fullName": "", "role": "GUEST", "password": ""}"#;
        let user: CurrentUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Unknown);
        assert_eq!(user.display_name(), "x@example.org");
    }

    #[test]
    fn test_partner_name_by_role() {
        let r = room(7, 0);
        assert_eq!(r.partner_name(Role::Student), "Sipho Dlamini");
        assert_eq!(r.partner_name(Role::Alumni), "Lerato Mokoena");
        assert_eq!(r.partner_name(Role::Admin), "Lerato Mokoena");
        assert_eq!(r.partner_name(Role::Unknown), "Mentorship 7");
        assert_eq!(r.partner_role(Role::Student), "Alumni");
    }

    #[test]
    fn test_partner_name_fallback() {
        let mut r = room(7, 0);
        r.alumni_name.clear();
        assert_eq!(r.partner_name(Role::Student), "Alumni");
    }

    #[test]
    fn test_last_activity() {
        let mut r = room(7, 0);
        r.last_message_at = "2024-03-01T10:00".to_string();
        assert!(r.last_activity("UTC").is_some());
    }

    #[test]
    fn test_directory_mark_read() {
        let mut directory = RoomDirectory::new();
        directory.replace_rooms(vec![room(1, 2), room(2, 5)]);
        assert_eq!(directory.total_unread(), 7);

        assert!(directory.mark_read(2));
        assert_eq!(directory.get(2).unwrap().unread_count, 0);
        assert_eq!(directory.total_unread(), 2);

        assert!(!directory.mark_read(99));
    }

    #[test]
    fn test_directory_user() {
        let mut directory = RoomDirectory::new();
        assert_eq!(directory.user_id(), None);
        assert_eq!(directory.role(), Role::Unknown);

        directory.set_user(Some(user(Role::Student)));
        directory.replace_rooms(vec![room(1, 0)]);

        assert_eq!(directory.user_id(), Some(10));
        assert_eq!(directory.partner_name(1), Some("Sipho Dlamini"));
        assert_eq!(directory.partner_name(2), None);
        assert!(directory.get(1).unwrap().is_participant(10));
    }
}
