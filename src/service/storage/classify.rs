/// What a failed request was addressed at. A bare `NotFound` (HEAD requests
/// come back without an error body) only makes sense relative to this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Bucket,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BucketNotFound,
    ObjectNotFound,
    BucketAlreadyOwned,
    Other,
}

pub fn classify(code: Option<&str>, subject: Subject) -> ErrorClass {
    match code {
        Some("NoSuchBucket") => ErrorClass::BucketNotFound,
        Some("NoSuchKey") => ErrorClass::ObjectNotFound,
        Some("BucketAlreadyOwnedByYou") => ErrorClass::BucketAlreadyOwned,
        Some("NotFound") => match subject {
            Subject::Bucket => ErrorClass::BucketNotFound,
            Subject::Object => ErrorClass::ObjectNotFound,
        },
        _ => ErrorClass::Other,
    }
}
