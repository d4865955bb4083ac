//! Building an [`AppContext`](crate::AppContext) from the Android runtime
//! hosting the current process.
//!
//! # Examples
//!
//! ```ignore
//! use android_app_utils::android;
//! use jni::objects::JObject;
//! use jni::JNIEnv;
//!
//! #[no_mangle]
//! pub extern "system" fn Java_com_example_App_nativeInit(mut env: JNIEnv, _this: JObject, context: JObject) {
//!     match android::context_builder(&mut env, &context) {
//!         Ok((builder, runtime)) => {
//!             let context = builder.build();
//!             // keep `context` and `runtime` for the lifetime of the process
//!         }
//!         Err(e) => log::error!("{e}"),
//!     }
//! }
//! ```

use crate::context::AppContextBuilder;
use jni::errors::Error as JNIError;
use jni::objects::{GlobalRef, JObject, JString};
use jni::{JNIEnv, JavaVM};

const BUILD_VERSION_CLASS: &str = "android/os/Build$VERSION";

/// A failed JNI call. Any Java exception it raised has already been
/// described to logcat and cleared.
#[derive(Debug, thiserror::Error)]
#[error("jni call failed: {0}")]
pub struct Error(#[from] JNIError);

/// The JVM and application `Context` of the hosting process.
pub struct AndroidRuntime {
    vm: JavaVM,
    context: GlobalRef,
}

impl AndroidRuntime {
    /// Keeps the JVM of `env` and a global reference to `context`.
    pub fn new(env: &mut JNIEnv, context: &JObject) -> Result<Self, Error> {
        with_exceptions_cleared(env, |env| {
            Ok(Self {
                vm: env.get_java_vm()?,
                context: env.new_global_ref(context)?,
            })
        })
    }

    /// Returns a handle to the current process' JVM.
    pub fn java_vm(&self) -> &JavaVM {
        &self.vm
    }

    /// Returns a reference to the application [Context].
    ///
    /// [Context]: <https://developer.android.com/reference/android/content/Context>
    pub fn context(&self) -> &GlobalRef {
        &self.context
    }

    /// Attaches the calling thread (if needed) and reads the package name
    /// and API level.
    pub fn app_context_builder(&self) -> Result<AppContextBuilder, Error> {
        let mut env = self.vm.attach_current_thread()?;
        read_builder(&mut env, self.context.as_obj())
    }
}

impl std::fmt::Debug for AndroidRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AndroidRuntime").finish_non_exhaustive()
    }
}

/// Reads `Build.VERSION.SDK_INT` and `Context.getPackageName()` into an
/// [`AppContextBuilder`], and keeps the JVM and `context` for later calls.
pub fn context_builder(
    env: &mut JNIEnv,
    context: &JObject,
) -> Result<(AppContextBuilder, AndroidRuntime), Error> {
    let runtime = AndroidRuntime::new(env, context)?;
    let builder = read_builder(env, context)?;
    Ok((builder, runtime))
}

fn read_builder(env: &mut JNIEnv, context: &JObject) -> Result<AppContextBuilder, Error> {
    with_exceptions_cleared(env, |env| {
        let sdk_int = env
            .get_static_field(BUILD_VERSION_CLASS, "SDK_INT", "I")?
            .i()?;
        let package_name = JString::from(
            env.call_method(context, "getPackageName", "()Ljava/lang/String;", &[])?
                .l()?,
        );
        let package_name: String = env.get_string(&package_name)?.into();
        log::debug!("running as {package_name} on api level {sdk_int}");

        Ok(AppContextBuilder::default()
            .package_name(package_name)
            .api_level(u32::try_from(sdk_int).unwrap_or_default()))
    })
}

// Runs `f` and, if it fails with a pending Java exception, logs and clears
// it so that later JNI calls on this thread are valid again.
fn with_exceptions_cleared<'local, T>(
    env: &mut JNIEnv<'local>,
    f: impl FnOnce(&mut JNIEnv<'local>) -> Result<T, JNIError>,
) -> Result<T, Error> {
    f(env).map_err(|cause| {
        if let JNIError::JavaException = cause {
            let _ = env.exception_describe();
            let _ = env.exception_clear();
        }
        Error(cause)
    })
}
