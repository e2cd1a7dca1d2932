/// People, identities, addresses, duplicates and merge
use crate::{
    auth::UserContext,
    context::AppContext,
    db::models::{Address, Person},
    dedup::DuplicateSuggestion,
    error::KindredResult,
    people::{
        IdentityCreated, ImportSummary, ImportedContact, NewAddress, NewIdentity, NewPerson,
        PersonCreated, PersonDetail, PersonUpdate,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/people", get(list_people).post(create_person))
        .route("/api/people/import", post(import_contacts))
        .route(
            "/api/people/:id",
            get(get_person).patch(update_person).delete(delete_person),
        )
        .route("/api/people/:id/identities", post(add_identity))
        .route(
            "/api/people/:id/identities/:identity_id",
            delete(remove_identity),
        )
        .route("/api/people/:id/addresses", post(add_address))
        .route("/api/people/:id/addresses/:address_id", delete(remove_address))
        .route("/api/duplicates", get(list_duplicates))
        .route("/api/merge", post(merge_people))
}

#[derive(Debug, Serialize)]
struct PeopleResponse {
    people: Vec<Person>,
}

async fn list_people(
    State(ctx): State<AppContext>,
    auth: UserContext,
) -> KindredResult<Json<PeopleResponse>> {
    let people = ctx.people.list_people(auth.id()).await?;
    Ok(Json(PeopleResponse { people }))
}

async fn create_person(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Json(req): Json<NewPerson>,
) -> KindredResult<(StatusCode, Json<PersonCreated>)> {
    let created = ctx.people.create_person(auth.id(), req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
struct ImportRequest {
    contacts: Vec<ImportedContact>,
}

async fn import_contacts(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Json(req): Json<ImportRequest>,
) -> KindredResult<Json<ImportSummary>> {
    let summary = ctx.people.import_contacts(auth.id(), req.contacts).await?;
    Ok(Json(summary))
}

async fn get_person(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
) -> KindredResult<Json<PersonDetail>> {
    Ok(Json(ctx.people.get_person(auth.id(), &id).await?))
}

async fn update_person(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
    Json(req): Json<PersonUpdate>,
) -> KindredResult<Json<Person>> {
    Ok(Json(ctx.people.update_person(auth.id(), &id, req).await?))
}

async fn delete_person(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
) -> KindredResult<StatusCode> {
    ctx.people.delete_person(auth.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_identity(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
    Json(req): Json<NewIdentity>,
) -> KindredResult<(StatusCode, Json<IdentityCreated>)> {
    let created = ctx.people.add_identity(auth.id(), &id, req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn remove_identity(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path((id, identity_id)): Path<(String, String)>,
) -> KindredResult<StatusCode> {
    ctx.people.remove_identity(auth.id(), &id, &identity_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_address(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path(id): Path<String>,
    Json(req): Json<NewAddress>,
) -> KindredResult<(StatusCode, Json<Address>)> {
    let address = ctx.people.add_address(auth.id(), &id, req).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

async fn remove_address(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Path((id, address_id)): Path<(String, String)>,
) -> KindredResult<StatusCode> {
    ctx.people.remove_address(auth.id(), &id, &address_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct DuplicatesResponse {
    suggestions: Vec<DuplicateSuggestion>,
}

async fn list_duplicates(
    State(ctx): State<AppContext>,
    auth: UserContext,
) -> KindredResult<Json<DuplicatesResponse>> {
    let suggestions = ctx.dedup.get_suggested_duplicates(auth.id()).await?;
    Ok(Json(DuplicatesResponse { suggestions }))
}

#[derive(Debug, Deserialize)]
struct MergeRequest {
    /// Kept
    #[serde(alias = "person1_id")]
    survivor_id: String,
    /// Folded into the survivor, then deleted
    #[serde(alias = "person2_id")]
    donor_id: String,
}

async fn merge_people(
    State(ctx): State<AppContext>,
    auth: UserContext,
    Json(req): Json<MergeRequest>,
) -> KindredResult<Json<PersonDetail>> {
    let merged = ctx
        .dedup
        .merge_people(auth.id(), &req.survivor_id, &req.donor_id)
        .await?;
    Ok(Json(merged))
}
