use log::{error, info};
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            answer_board::{
                AnswerBoardDescription, AnswerBoardForm, AnswerBoardSummary, AnswerRequest,
                AnswerSubmission,
            },
            auth::AuthToken,
            notice::{Notice, ANSWER_BOARD_REQUESTED, ANSWER_BOARD_UPDATED},
        },
        common::token::AnswerToken,
        db::{AnswerBoard, NewAnswerBoard, Owner, QuestionBoard},
        mongodb::Id,
        store::Store,
    },
    notify::{Mail, Mailer},
};

use super::common::{owned_question_board, BaseUrl};

pub fn routes() -> Vec<Route> {
    routes![
        request_answer_board,
        list_answer_boards,
        edit_answer_board,
        update_answer_board,
        get_answer_board,
    ]
}

/// Resolve a respondent token to its answer board and the question board it answers.
async fn boards_for_token(
    store: &Store,
    config: &Config,
    token: &AnswerToken,
) -> Result<(QuestionBoard, AnswerBoard)> {
    let answers = store
        .find_answer_board(&token.digest(config))
        .await?
        .ok_or_else(|| Error::not_found("Answer board".to_string()))?;
    let board = store
        .find_question_board(answers.question_board_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Question board {}", answers.question_board_id)))?;
    Ok((board, answers))
}

#[post(
    "/question_boards/<board_id>/answer_boards",
    data = "<request>",
    format = "json"
)]
async fn request_answer_board(
    token: AuthToken<Owner>,
    board_id: Id,
    request: Json<AnswerRequest>,
    store: Store,
    mailer: &State<Mailer>,
    config: &State<Config>,
    base_url: BaseUrl,
) -> Result<(Status, Json<Notice<AnswerBoardSummary>>)> {
    let board = owned_question_board(&store, &token, board_id).await?;
    let email = request.0.into_email().map_err(Error::Validation)?;
    let owner = store
        .find_owner(token.id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Owner {}", token.id)))?;

    let answer_token = AnswerToken::generate();
    let answers = store
        .insert_answer_board(NewAnswerBoard::new(
            board.id,
            email.clone(),
            answer_token.digest(config),
        ))
        .await?;

    let link = base_url.join(uri!(edit_answer_board(answer_token)));
    let mail = Mail::answer_request(&owner.name, email, config.mail_from().to_string(), &link);
    if let Err(e) = mailer.deliver(&mail).await {
        error!("Withdrawing answer board {} after failed delivery", answers.id);
        store.delete_answer_board(answers.id).await?;
        return Err(e);
    }
    info!("Sent answer board {} for question board {}", answers.id, board.id);

    Ok((
        Status::Created,
        Json(Notice::new(
            ANSWER_BOARD_REQUESTED,
            AnswerBoardSummary::new(&board, &answers),
        )),
    ))
}

#[get("/question_boards/<board_id>/answer_boards")]
async fn list_answer_boards(
    token: AuthToken<Owner>,
    board_id: Id,
    store: Store,
) -> Result<Json<Vec<AnswerBoardSummary>>> {
    let board = owned_question_board(&store, &token, board_id).await?;
    let summaries = store
        .answer_boards_for(board.id)
        .await?
        .iter()
        .map(|answers| AnswerBoardSummary::new(&board, answers))
        .collect();
    Ok(Json(summaries))
}

#[get("/answer_boards/<token>/edit")]
async fn edit_answer_board(
    token: AnswerToken,
    store: Store,
    config: &State<Config>,
) -> Result<Json<AnswerBoardForm>> {
    let (board, answers) = boards_for_token(&store, config, &token).await?;
    Ok(Json(AnswerBoardForm::new(&board, &answers)))
}

#[put("/answer_boards/<token>", data = "<submission>", format = "json")]
async fn update_answer_board(
    token: AnswerToken,
    submission: Json<AnswerSubmission>,
    store: Store,
    config: &State<Config>,
) -> Result<Json<Notice<AnswerBoardDescription>>> {
    let (board, answers) = boards_for_token(&store, config, &token).await?;
    let update = submission.0.into_update(&board).map_err(Error::Validation)?;
    let answers = store
        .update_answers(&answers.token_digest, update)
        .await?
        .ok_or_else(|| Error::not_found("Answer board".to_string()))?;
    info!("Updated answer board {}", answers.id);
    Ok(Json(Notice::new(
        ANSWER_BOARD_UPDATED,
        AnswerBoardDescription::new(&board, &answers),
    )))
}

#[get("/answer_boards/<token>")]
async fn get_answer_board(
    token: AnswerToken,
    store: Store,
    config: &State<Config>,
) -> Result<Json<AnswerBoardDescription>> {
    let (board, answers) = boards_for_token(&store, config, &token).await?;
    Ok(Json(AnswerBoardDescription::new(&board, &answers)))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::{serde_json::json, Value},
    };

    use crate::{
        model::api::{
            answer_board::AnswerSpec,
            id::ApiId,
            auth::{OwnerCredentials, OwnerRegistration},
            question_board::{QuestionBoardDescription, QuestionBoardSpec},
        },
        notify::Outbox,
    };

    use super::*;

    const BASE_URL: &str = "http://127.0.0.1:8000";

    async fn create_board(client: &Client, spec: &QuestionBoardSpec) -> QuestionBoardDescription {
        let response = client
            .post("/question_boards")
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let notice: Notice<QuestionBoardDescription> = response.into_json().await.unwrap();
        notice.data
    }

    /// Request answers to the board, returning the path of the link that was mailed.
    async fn request_answers(client: &Client, outbox: &Outbox, board_id: Id, email: &str) -> String {
        let response = client
            .post(uri!(request_answer_board(board_id)))
            .header(ContentType::JSON)
            .body(json!({ "email": email }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let notice: Notice<AnswerBoardSummary> = response.into_json().await.unwrap();
        assert_eq!(notice.notice, ANSWER_BOARD_REQUESTED);
        assert_eq!(notice.data.email, email);
        assert!(!notice.data.answered);

        let mail = outbox.last().unwrap();
        assert_eq!(mail.to, email);
        let link = mail.body.lines().nth(2).unwrap();
        link.strip_prefix(BASE_URL).unwrap().to_string()
    }

    fn submission(name: Option<&str>, answers: &[(ApiId, &str)]) -> String {
        let submission = AnswerSubmission {
            name: name.map(str::to_string),
            answers: answers
                .iter()
                .map(|(question_id, body)| AnswerSpec {
                    question_id: *question_id,
                    body: body.to_string(),
                })
                .collect(),
        };
        json!(submission).to_string()
    }

    #[backend_test(owner)]
    async fn answer_flow(client: Client, outbox: Outbox) {
        let board = create_board(&client, &QuestionBoardSpec::example()).await;
        let edit_path = request_answers(&client, &outbox, board.id.into(), "ada@example.com").await;

        // The mail.
        let mail = outbox.last().unwrap();
        assert_eq!(mail.from, "from@example.com");
        assert_eq!(mail.subject, "[1 ON 1] Johnさんより質問事項が届いています");
        assert!(mail.body.starts_with("1 ON 1サービスより質問事項が届いています。\r\n"));
        assert!(edit_path.starts_with("/answer_boards/"));
        assert!(edit_path.ends_with("/edit"));
        let answer_path = edit_path.trim_end_matches("/edit").to_string();

        // Respondents need no account.
        client.delete("/auth").dispatch().await;

        // Blank form, in question order.
        let response = client.get(edit_path.as_str()).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let form: AnswerBoardForm = response.into_json().await.unwrap();
        assert_eq!(form.title, "Basic Questions");
        assert_eq!(form.name, "");
        assert_eq!(form.questions.len(), 3);
        assert!(form.questions.iter().all(|field| field.answer.is_empty()));
        let [q1, q2, q3] = [0, 1, 2].map(|i| form.questions[i].question_id);

        // First submission.
        let response = client
            .put(answer_path.as_str())
            .header(ContentType::JSON)
            .body(submission(
                Some("Ada Wong"),
                &[(q1, "1st answer."), (q2, "2nd answer."), (q3, "3rd answer.")],
            ))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let notice: Notice<AnswerBoardDescription> = response.into_json().await.unwrap();
        assert_eq!(notice.notice, ANSWER_BOARD_UPDATED);
        assert_eq!(notice.data.email, "ada@example.com");
        assert_eq!(notice.data.name, "Ada Wong");
        let answers: Vec<_> = notice.data.answers.iter().map(|a| a.answer.as_str()).collect();
        assert_eq!(answers, ["1st answer.", "2nd answer.", "3rd answer."]);

        // The form now shows what was submitted.
        let response = client.get(edit_path.as_str()).dispatch().await;
        let form: AnswerBoardForm = response.into_json().await.unwrap();
        assert_eq!(form.name, "Ada Wong");
        assert_eq!(form.questions[1].answer, "2nd answer.");

        // Partial re-edit leaves the second answer alone.
        let response = client
            .put(answer_path.as_str())
            .header(ContentType::JSON)
            .body(submission(
                Some("エイダ・ウォン"),
                &[(q1, "最初の答え"), (q3, "最後の答え")],
            ))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let response = client.get(answer_path.as_str()).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let detail: AnswerBoardDescription = response.into_json().await.unwrap();
        assert_eq!(detail.name, "エイダ・ウォン");
        let answers: Vec<_> = detail.answers.iter().map(|a| a.answer.as_str()).collect();
        assert_eq!(answers, ["最初の答え", "2nd answer.", "最後の答え"]);
        let questions: Vec<_> = detail.answers.iter().map(|a| a.question.as_str()).collect();
        assert_eq!(
            questions,
            [
                "Is this 1st question?",
                "Is this 2nd question?",
                "Is this 3rd question?"
            ]
        );

        // The owner sees the answers.
        client
            .post("/auth/owner")
            .header(ContentType::JSON)
            .body(json!(OwnerCredentials::example()).to_string())
            .dispatch()
            .await;
        let response = client
            .get(uri!(list_answer_boards(Id::from(board.id))))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let summaries: Vec<AnswerBoardSummary> = response.into_json().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].answered);
        assert_eq!(summaries[0].name, "エイダ・ウォン");
        assert_eq!(summaries[0].answers[1].answer, "2nd answer.");
    }

    #[backend_test(owner)]
    async fn unknown_tokens_are_not_found(client: Client) {
        let token = AnswerToken::generate();
        let response = client.get(uri!(edit_answer_board(token.clone()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let response = client.get(uri!(get_answer_board(token.clone()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let response = client
            .put(uri!(update_answer_board(token)))
            .header(ContentType::JSON)
            .body(json!({ "name": "Nobody" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());

        // Not even shaped like a token.
        let response = client.get("/answer_boards/not!a!token").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(owner)]
    async fn invalid_email_sends_nothing(client: Client, outbox: Outbox) {
        let board = create_board(&client, &QuestionBoardSpec::example()).await;
        let response = client
            .post(uri!(request_answer_board(Id::from(board.id))))
            .header(ContentType::JSON)
            .body(json!({ "email": "ada" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["errors"]["email"][0], "Emailは不正な値です");
        assert!(outbox.deliveries().is_empty());

        let response = client
            .get(uri!(list_answer_boards(Id::from(board.id))))
            .dispatch()
            .await;
        let summaries: Vec<AnswerBoardSummary> = response.into_json().await.unwrap();
        assert!(summaries.is_empty());
    }

    #[backend_test(owner)]
    async fn answers_to_foreign_questions_are_rejected(client: Client, outbox: Outbox) {
        let board = create_board(&client, &QuestionBoardSpec::example()).await;
        let other = create_board(&client, &QuestionBoardSpec::crud_example()).await;
        let edit_path = request_answers(&client, &outbox, board.id.into(), "ada@example.com").await;
        let answer_path = edit_path.trim_end_matches("/edit").to_string();

        let response = client
            .put(answer_path.as_str())
            .header(ContentType::JSON)
            .body(submission(None, &[(other.questions[0].id, "wrong board")]))
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["errors"]["answers[0]"][0], "Questionが見つかりません");

        let response = client.get(answer_path.as_str()).dispatch().await;
        let detail: AnswerBoardDescription = response.into_json().await.unwrap();
        assert!(detail.answers.iter().all(|a| a.answer.is_empty()));
    }

    #[backend_test(owner)]
    async fn board_edits_reach_answer_boards(client: Client, outbox: Outbox) {
        let board = create_board(&client, &QuestionBoardSpec::example()).await;
        let board_id = Id::from(board.id);
        let edit_path = request_answers(&client, &outbox, board_id, "ada@example.com").await;
        let answer_path = edit_path.trim_end_matches("/edit").to_string();
        let [q1, q2, q3] = [0, 1, 2].map(|i| board.questions[i].id);

        client
            .put(answer_path.as_str())
            .header(ContentType::JSON)
            .body(submission(Some("Ada Wong"), &[(q1, "1"), (q2, "2"), (q3, "3")]))
            .dispatch()
            .await;

        // Drop the second question.
        let spec = json!({
            "title": "Basic Questions",
            "questions": [
                { "id": q1, "text": "Is this 1st question?" },
                { "id": q3, "text": "Is this 3rd question?" },
            ],
        });
        let board_path = format!("/question_boards/{board_id}");
        let response = client
            .put(board_path.as_str())
            .header(ContentType::JSON)
            .body(spec.to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let response = client.get(answer_path.as_str()).dispatch().await;
        let detail: AnswerBoardDescription = response.into_json().await.unwrap();
        let answers: Vec<_> = detail.answers.iter().map(|a| a.answer.as_str()).collect();
        assert_eq!(answers, ["1", "3"]);

        // Deleting the board takes the answer board with it.
        let delete_path = format!("{board_path}?confirmed=true");
        let response = client
            .delete(delete_path.as_str())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let response = client.get(edit_path.as_str()).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(owner)]
    async fn other_owners_cannot_request_answers(client: Client, outbox: Outbox) {
        let board = create_board(&client, &QuestionBoardSpec::example()).await;
        client
            .post("/auth/owners")
            .header(ContentType::JSON)
            .body(OwnerRegistration::example2().to_request_body())
            .dispatch()
            .await;

        let response = client
            .post(uri!(request_answer_board(Id::from(board.id))))
            .header(ContentType::JSON)
            .body(json!({ "email": "ada@example.com" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
        assert!(outbox.deliveries().is_empty());
    }

    #[rocket::async_test]
    async fn failed_delivery_withdraws_answer_board() {
        // Nothing listens on the discard port, so every delivery fails.
        let rocket = crate::rocket_for_tests();
        let figment = rocket
            .figment()
            .clone()
            .merge(("mail_relay_url", "http://127.0.0.1:9/mail"));
        let client = Client::tracked(rocket.configure(figment)).await.unwrap();
        let store = client.rocket().state::<Store>().unwrap().clone();

        client
            .post("/auth/owners")
            .header(ContentType::JSON)
            .body(OwnerRegistration::example().to_request_body())
            .dispatch()
            .await;
        let board = create_board(&client, &QuestionBoardSpec::example()).await;

        let response = client
            .post(uri!(request_answer_board(Id::from(board.id))))
            .header(ContentType::JSON)
            .body(json!({ "email": "ada@example.com" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadGateway, response.status());
        assert!(store
            .answer_boards_for(board.id.into())
            .await
            .unwrap()
            .is_empty());
    }
}
