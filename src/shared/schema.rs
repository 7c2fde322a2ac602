diesel::table! {
    users (id) {
        id -> Uuid,
        external_id -> Text,
        email -> Text,
        name -> Text,
        role -> Text,
        description -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    projects (id) {
        id -> Uuid,
        key -> Text,
        name -> Text,
        description -> Nullable<Text>,
        status -> Text,
        lead_user_id -> Uuid,
        member_ids -> Array<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    tasks (id) {
        id -> Uuid,
        project_id -> Uuid,
        key -> Text,
        title -> Text,
        description -> Nullable<Text>,
        status -> Text,
        priority -> Text,
        assignee_id -> Nullable<Uuid>,
        reporter_id -> Nullable<Uuid>,
        parent_task_id -> Nullable<Uuid>,
        due_date -> Nullable<Timestamptz>,
        generated_by -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    task_dependencies (task_id, depends_on_task_id) {
        task_id -> Uuid,
        depends_on_task_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    task_comments (id) {
        id -> Uuid,
        task_id -> Uuid,
        author_id -> Uuid,
        role -> Text,
        body -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    documents (id) {
        id -> Uuid,
        project_id -> Uuid,
        title -> Text,
        content -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    narrative_sections (id) {
        id -> Uuid,
        project_id -> Uuid,
        heading -> Text,
        body -> Nullable<Text>,
        position -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    investor_conversations (id) {
        id -> Uuid,
        user_id -> Uuid,
        title -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    chat_messages (id) {
        id -> Uuid,
        session_id -> Text,
        user_id -> Nullable<Uuid>,
        role -> Text,
        content -> Text,
        metadata -> Nullable<Jsonb>,
        stage -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    idea_states (session_id) {
        session_id -> Text,
        state -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(tasks -> projects (project_id));
diesel::joinable!(task_comments -> tasks (task_id));
diesel::joinable!(documents -> projects (project_id));
diesel::joinable!(narrative_sections -> projects (project_id));
diesel::joinable!(investor_conversations -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    projects,
    tasks,
    task_dependencies,
    task_comments,
    documents,
    narrative_sections,
    investor_conversations,
    chat_messages,
    idea_states,
);
