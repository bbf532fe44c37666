use uuid::Uuid;

/// A fresh, collision-free id such as `group_3f2a...`.
pub fn generate(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}
