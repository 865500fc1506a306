use log::info;
use rocket::{http::Status, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::AuthToken,
            notice::{
                Notice, QUESTION_BOARD_CREATED, QUESTION_BOARD_DESTROYED, QUESTION_BOARD_UPDATED,
            },
            question_board::{
                QuestionBoardDescription, QuestionBoardForm, QuestionBoardSpec,
                QuestionBoardSummary,
            },
        },
        db::Owner,
        mongodb::Id,
        store::Store,
    },
};

use super::common::owned_question_board;

pub fn routes() -> Vec<Route> {
    routes![
        list_question_boards,
        new_question_board,
        create_question_board,
        get_question_board,
        edit_question_board,
        update_question_board,
        delete_question_board,
    ]
}

#[get("/question_boards")]
async fn list_question_boards(
    token: AuthToken<Owner>,
    store: Store,
) -> Result<Json<Vec<QuestionBoardSummary>>> {
    let boards = store.question_boards_for(token.id).await?;
    Ok(Json(boards.into_iter().map(Into::into).collect()))
}

#[get("/question_boards/new")]
fn new_question_board(_token: AuthToken<Owner>) -> Json<QuestionBoardForm> {
    Json(QuestionBoardForm::default())
}

#[post("/question_boards", data = "<spec>", format = "json")]
async fn create_question_board(
    token: AuthToken<Owner>,
    spec: Json<QuestionBoardSpec>,
    store: Store,
) -> Result<(Status, Json<Notice<QuestionBoardDescription>>)> {
    let board = spec.0.into_new_board(token.id).map_err(Error::Validation)?;
    let board = store.insert_question_board(board).await?;
    info!("Created question board {}", board.id);
    Ok((
        Status::Created,
        Json(Notice::new(QUESTION_BOARD_CREATED, board.into())),
    ))
}

#[get("/question_boards/<board_id>", rank = 2)]
async fn get_question_board(
    token: AuthToken<Owner>,
    board_id: Id,
    store: Store,
) -> Result<Json<QuestionBoardDescription>> {
    let board = owned_question_board(&store, &token, board_id).await?;
    Ok(Json(board.into()))
}

#[get("/question_boards/<board_id>/edit")]
async fn edit_question_board(
    token: AuthToken<Owner>,
    board_id: Id,
    store: Store,
) -> Result<Json<QuestionBoardForm>> {
    let board = owned_question_board(&store, &token, board_id).await?;
    Ok(Json(QuestionBoardForm::from(&board)))
}

#[put("/question_boards/<board_id>", data = "<spec>", format = "json")]
async fn update_question_board(
    token: AuthToken<Owner>,
    board_id: Id,
    spec: Json<QuestionBoardSpec>,
    store: Store,
) -> Result<Json<Notice<QuestionBoardDescription>>> {
    let board = owned_question_board(&store, &token, board_id).await?;
    let (title, questions) = spec.0.into_update(&board).map_err(Error::Validation)?;
    let board = store
        .update_question_board(board_id, title, questions)
        .await?
        .ok_or_else(|| Error::not_found(format!("Question board {board_id}")))?;
    info!("Updated question board {board_id}");
    Ok(Json(Notice::new(QUESTION_BOARD_UPDATED, board.into())))
}

#[delete("/question_boards/<board_id>?<confirmed>")]
async fn delete_question_board(
    token: AuthToken<Owner>,
    board_id: Id,
    confirmed: Option<bool>,
    store: Store,
) -> Result<Json<Notice<()>>> {
    owned_question_board(&store, &token, board_id).await?;
    if confirmed != Some(true) {
        return Err(Error::Status(
            Status::PreconditionRequired,
            format!("Deleting question board {board_id} requires confirmation"),
        ));
    }
    if !store.delete_question_board(board_id).await? {
        return Err(Error::not_found(format!("Question board {board_id}")));
    }
    info!("Deleted question board {board_id}");
    Ok(Json(Notice::new(QUESTION_BOARD_DESTROYED, ())))
}
