diesel::table! {
    customers (id) {
        id -> Uuid,
        email -> Varchar,
        password_hash -> Varchar,
        full_name -> Varchar,
        phone -> Nullable<Varchar>,
        address -> Nullable<Text>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    admin_users (id) {
        id -> Uuid,
        email -> Varchar,
        password_hash -> Varchar,
        display_name -> Varchar,
        role -> Varchar,
        is_active -> Bool,
        last_login -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    service_tickets (id) {
        id -> Uuid,
        ticket_number -> Varchar,
        customer_id -> Uuid,
        subject -> Varchar,
        description -> Nullable<Text>,
        status -> Varchar,
        priority -> Varchar,
        assigned_to -> Nullable<Uuid>,
        completed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    ticket_messages (id) {
        id -> Uuid,
        ticket_id -> Uuid,
        sender_customer_id -> Nullable<Uuid>,
        sender_admin_id -> Nullable<Uuid>,
        body -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    ticket_attachments (id) {
        id -> Uuid,
        ticket_id -> Uuid,
        file_name -> Varchar,
        object_key -> Varchar,
        content_type -> Varchar,
        size_bytes -> Int8,
        uploaded_by_admin -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    appointments (id) {
        id -> Uuid,
        customer_id -> Uuid,
        service -> Varchar,
        notes -> Nullable<Text>,
        requested_for -> Timestamptz,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    appointment_cancellation_requests (id) {
        id -> Uuid,
        appointment_id -> Uuid,
        customer_id -> Uuid,
        reason -> Nullable<Text>,
        status -> Varchar,
        reviewed_by -> Nullable<Uuid>,
        reviewed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    contact_submissions (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        phone -> Nullable<Varchar>,
        message -> Text,
        processed -> Bool,
        processed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    customers,
    admin_users,
    service_tickets,
    ticket_messages,
    ticket_attachments,
    appointments,
    appointment_cancellation_requests,
    contact_submissions,
);
