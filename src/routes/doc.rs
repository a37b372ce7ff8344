use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{SetActiveRequest, UserList},
        auth::{ChangePasswordRequest, LoginForm, Profile, RegisterRequest, Token},
        invoices::{
            InvoiceDeleted, InvoiceItemInput, InvoiceList, InvoicePayload, InvoiceSaved,
            InvoiceStats, InvoiceWithItems, SetPaidRequest,
        },
        shops::{CreateShopRequest, ShopCreated},
    },
    models::{Invoice, InvoiceItem, Shop, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, health, invoices, params, shops},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        auth::change_password,
        auth::me,
        shops::create_shop,
        shops::my_shop,
        invoices::list_invoices,
        invoices::invoice_stats,
        invoices::get_invoice,
        invoices::create_invoice,
        invoices::update_invoice,
        invoices::set_paid,
        invoices::delete_invoice,
        admin::list_users,
        admin::set_user_active
    ),
    components(
        schemas(
            User,
            Shop,
            Invoice,
            InvoiceItem,
            LoginForm,
            RegisterRequest,
            ChangePasswordRequest,
            Token,
            Profile,
            CreateShopRequest,
            ShopCreated,
            InvoiceItemInput,
            InvoicePayload,
            SetPaidRequest,
            InvoiceWithItems,
            InvoiceSaved,
            InvoiceDeleted,
            InvoiceList,
            InvoiceStats,
            SetActiveRequest,
            UserList,
            params::Pagination,
            params::SortOrder,
            params::InvoiceSortBy,
            Meta,
            ApiResponse<Token>,
            ApiResponse<InvoiceList>,
            ApiResponse<InvoiceWithItems>,
            ApiResponse<InvoiceSaved>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Login, registration and profile"),
        (name = "Shops", description = "Shop of the current operator"),
        (name = "Invoices", description = "Invoice endpoints"),
        (name = "Admin", description = "Superuser endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
