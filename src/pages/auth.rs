use leptos::*;

use crate::api;
use crate::types::{AppView, AuthSession};

#[component]
pub fn Auth(
    register: bool,
    set_view: WriteSignal<AppView>,
    set_auth: WriteSignal<Option<AuthSession>>,
) -> impl IntoView {
    let (email, set_email) = create_signal(String::new());
    let (password, set_password) = create_signal(String::new());
    let (password2, set_password2) = create_signal(String::new());
    let (error, set_error) = create_signal(Option::<String>::None);
    let (loading, set_loading) = create_signal(false);

    let submit = move |_| {
        let email = email.get();
        let password = password.get();

        if register {
            if password != password2.get() {
                set_error.set(Some("Passwords do not match".into()));
                return;
            }
            if password.len() < 6 {
                set_error.set(Some("Password must be at least 6 characters".into()));
                return;
            }
        }

        set_loading.set(true);
        set_error.set(None);

        spawn_local(async move {
            let result = if register {
                api::sign_up(&email, &password).await
            } else {
                api::sign_in(&email, &password).await
            };
            match result {
                Ok(session) => {
                    set_auth.set(Some(session));
                    set_view.set(AppView::Calendar);
                }
                Err(e) => {
                    set_error.set(Some(e));
                    set_loading.set(false);
                }
            }
        });
    };

    let title = if register { "Create account" } else { "Sign in" };
    let action = move || {
        if loading.get() {
            "Working..."
        } else if register {
            "Create account"
        } else {
            "Sign in"
        }
    };

    view! {
        <div class="auth-container">
            <div class="auth-logo">"SETFORGE"</div>
            <div class="auth-card">
                <h2 class="auth-title">{title}</h2>

                {move || error.get().map(|e| view! { <div class="auth-error">{e}</div> })}

                <input
                    type="email"
                    class="auth-input"
                    placeholder="Email"
                    on:input=move |ev| set_email.set(event_target_value(&ev))
                    prop:value=email
                />

                <input
                    type="password"
                    class="auth-input"
                    placeholder="Password"
                    on:input=move |ev| set_password.set(event_target_value(&ev))
                    prop:value=password
                />

                {register.then(|| view! {
                    <input
                        type="password"
                        class="auth-input"
                        placeholder="Confirm password"
                        on:input=move |ev| set_password2.set(event_target_value(&ev))
                        prop:value=password2
                    />
                })}

                <button class="auth-button" on:click=submit disabled=move || loading.get()>
                    {action}
                </button>

                <div class="auth-switch">
                    {if register { "Have an account? " } else { "No account? " }}
                    <button
                        class="auth-link"
                        on:click=move |_| set_view.set(if register { AppView::Login } else { AppView::Register })
                    >
                        {if register { "Sign in" } else { "Register" }}
                    </button>
                </div>
            </div>
        </div>
    }
}
