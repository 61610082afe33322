use tide::{Redirect, Request, Response};

use crate::models::photos::NewPhoto;

mod utils;

use utils::{html_response, query_params, render};

pub(in super::super) fn mount(route: &mut tide::Server<crate::State>) {
    // Static routes go first so that /photos/new never ends up at `show` with an id of "new".
    route.at("/photos/new").get(new_form);
    route.at("/create_photo").get(create_row);
    route.at("/index").get(index);

    route.at("/photos/:id").get(show);
}

async fn show(req: Request<crate::State>) -> tide::Result<Response> {
    let state = req.state();
    let photo_id = req.param("id")?;

    let photo = match state.photos.get_photo_by_id(photo_id).await? {
        Some(photo) => photo,
        None => {
            tide::log::debug!("No photo with id {:?}", photo_id);
            return Ok(Response::builder(tide::http::StatusCode::NotFound).build());
        },
    };

    let mut context = tera::Context::new();
    context.insert("title", &format!("Photo #{}", photo.id));
    context.insert("photo", &photo);

    let body = render(state, "photos/show.html", &context)?;
    Ok(html_response(body))
}

async fn new_form(req: Request<crate::State>) -> tide::Result<Response> {
    let mut context = tera::Context::new();
    context.insert("title", "New photo");

    let body = render(req.state(), "photos/new.html", &context)?;
    Ok(html_response(body))
}

async fn create_row(req: Request<crate::State>) -> tide::Result<Response> {
    let state = req.state();
    let mut params = query_params(req.url().query())?;

    let new_photo = NewPhoto {
        source: params.remove("the_source").unwrap_or_default(),
        caption: params.remove("the_caption").unwrap_or_default(),
    };
    tide::log::debug!("Creating photo: {:?}", new_photo);

    let id = state.photos.insert_photo(&new_photo).await?;
    tide::log::info!("Created photo {}", id);

    Ok(Redirect::new("/photos/new").into())
}

async fn index(req: Request<crate::State>) -> tide::Result<Response> {
    let state = req.state();
    let photos = state.photos.get_all_photos().await?;

    let mut context = tera::Context::new();
    context.insert("title", "All photos");
    context.insert("photos", &photos);

    let body = render(state, "photos/index.html", &context)?;
    Ok(html_response(body))
}
