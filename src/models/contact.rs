use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub body: String,
    pub created_at: String,
}

impl std::fmt::Display for ContactMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "message from {}", self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub body: String,
}
