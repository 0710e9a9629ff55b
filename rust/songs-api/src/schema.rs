//! Diesel schema for the songs table.

diesel::table! {
    use diesel::sql_types::*;

    songs (id) {
        id -> Int8,
        group -> Text,
        song -> Text,
        text -> Text,
    }
}
