use tide::{http::StatusCode, utils::After, Response};

pub mod html;

pub(super) fn mount(app: &mut tide::Server<crate::State>) {
    // A known path with an unsupported method is just another unknown route.
    app.with(After(|mut res: Response| async move {
        if res.status() == StatusCode::MethodNotAllowed {
            res.set_status(StatusCode::NotFound);
        }
        Ok(res)
    }));

    html::mount(app);
}
