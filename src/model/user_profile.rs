use super::Tags;

/// A principal's profile inside a domain.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub arn: String,
    pub name: String,
    pub domain_id: String,
    pub execution_role: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfileSpec {
    pub domain_id: String,
    pub execution_role: String,
    pub tags: Tags,
}
