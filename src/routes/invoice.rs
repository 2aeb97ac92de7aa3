// ABOUTME: Sample invoice download route used by the chat front end
// ABOUTME: Serves the bundled sample invoice PDF for any order id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::info;

/// Location of the sample invoice, relative to the static asset directory
pub const SAMPLE_INVOICE: &str = "samples/invoice.pdf";

/// Invoice routes implementation
pub struct InvoiceRoutes;

impl InvoiceRoutes {
    /// Create the invoice route over the static asset directory
    pub fn routes(public_dir: &FsPath) -> Router {
        let invoice = Arc::new(public_dir.join(SAMPLE_INVOICE));
        Router::new()
            .route("/orders/:order_id/invoice", get(Self::invoice_handler))
            .with_state(invoice)
    }

    async fn invoice_handler(
        Path(order_id): Path<String>,
        State(invoice): State<Arc<PathBuf>>,
        request: Request,
    ) -> Response {
        info!(%order_id, "Fetching invoice for order");
        match ServeFile::new(invoice.as_path()).oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        }
    }
}
