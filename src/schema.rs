// Diesel table definitions for the dispatch database.

diesel::table! {
    email_lists (id) {
        id -> Integer,
        name -> Text,
        description -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    subscribers (id) {
        id -> Integer,
        email_list_id -> Integer,
        email -> Text,
        first_name -> Nullable<Text>,
        last_name -> Nullable<Text>,
        status -> Text,
        subscribed_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    campaigns (id) {
        id -> Integer,
        email_list_id -> Integer,
        name -> Text,
        subject -> Text,
        content -> Text,
        template_id -> Nullable<Text>,
        status -> Text,
        sent_at -> Nullable<Timestamp>,
        recipient_count -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    campaign_events (id) {
        id -> Integer,
        campaign_id -> Integer,
        subscriber_id -> Integer,
        event_type -> Text,
        event_data -> Text,
        message_id -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::joinable!(subscribers -> email_lists (email_list_id));
diesel::joinable!(campaigns -> email_lists (email_list_id));
diesel::joinable!(campaign_events -> campaigns (campaign_id));
diesel::joinable!(campaign_events -> subscribers (subscriber_id));

diesel::allow_tables_to_appear_in_same_query!(email_lists, subscribers, campaigns, campaign_events);
