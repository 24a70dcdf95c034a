use super::Tags;

/// An object-storage bucket, either owned by one principal or shared by all.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub arn: String,
    pub name: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketSpec {
    pub tags: Tags,
}
