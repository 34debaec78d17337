use diesel::prelude::*;

diesel::table! {
    buckets(name) {
        name -> Text,
    }
}

diesel::table! {
    entries(bucket, key) {
        bucket -> Text,
        key -> Text,
        value -> Binary,
    }
}

#[derive(Debug, Clone, Queryable)]
pub struct EntryDTO {
    pub key: String,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = buckets)]
pub struct AddBucketDTO<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = entries)]
pub struct AddEntryDTO<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
    pub value: &'a [u8],
}
