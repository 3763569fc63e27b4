use sqlx::SqlitePool;
use tracing::info;

use crate::{
    auth::hash_password_blocking,
    directory::{self, NewUser},
    error::{CoreError, CoreResult},
};

struct DemoUser {
    name: &'static str,
    email: &'static str,
    bio: &'static str,
    offered: &'static [&'static str],
    desired: &'static [&'static str],
    is_admin: bool,
}

const DEMO_PASSWORD: &str = "demo123";

const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        name: "Gitanjali A",
        email: "gitanjali@pesu.ac.in",
        bio: "Frontend enthusiast looking to expand into backend development.",
        offered: &["React.js", "UI/UX Design", "Frontend Development", "Tailwind CSS", "Figma"],
        desired: &["Node.js", "MongoDB", "Backend Development", "REST APIs"],
        is_admin: false,
    },
    DemoUser {
        name: "Harsimran Kaur",
        email: "harsimran@pesu.ac.in",
        bio: "Backend developer building APIs, eager to learn modern frontend frameworks.",
        offered: &["Node.js", "Express.js", "MongoDB", "REST APIs", "JWT Authentication"],
        desired: &["React.js", "UI/UX Design", "Frontend Development"],
        is_admin: false,
    },
    DemoUser {
        name: "Navya Suresh",
        email: "navya@pesu.ac.in",
        bio: "Data science student exploring web development.",
        offered: &["Python", "Data Science", "Machine Learning", "Pandas", "NumPy"],
        desired: &["Web Development", "React.js", "JavaScript", "Full Stack Development"],
        is_admin: true,
    },
    DemoUser {
        name: "Rahul Sharma",
        email: "rahul@pesu.ac.in",
        bio: "Mobile app developer interested in web technologies.",
        offered: &["Flutter", "Dart", "Mobile Development", "Firebase"],
        desired: &["React.js", "Next.js", "Web Development"],
        is_admin: false,
    },
    DemoUser {
        name: "Priya Patel",
        email: "priya@pesu.ac.in",
        bio: "DevOps enthusiast learning cloud infrastructure and CI/CD.",
        offered: &["Docker", "Kubernetes", "AWS", "CI/CD"],
        desired: &["Backend Development", "Node.js", "Microservices"],
        is_admin: false,
    },
];

/// Inserts the demo accounts, skipping any whose email is already taken.
/// Returns how many were created.
pub async fn seed_demo_users(db_pool: &SqlitePool) -> CoreResult<usize> {
    let mut created = 0;
    for demo in DEMO_USERS {
        let password_hash = hash_password_blocking(DEMO_PASSWORD.to_owned()).await?;
        let result = directory::create_user(
            db_pool,
            NewUser {
                name: demo.name.to_owned(),
                email: demo.email.to_owned(),
                password_hash,
                bio: demo.bio.to_owned(),
                offered_skills: demo.offered.iter().map(|s| s.to_string()).collect(),
                desired_skills: demo.desired.iter().map(|s| s.to_string()).collect(),
                is_admin: demo.is_admin,
                verified: true,
            },
        )
        .await;

        match result {
            Ok(user) => {
                info!(email = %user.email, "seeded demo user");
                created += 1;
            }
            Err(CoreError::Conflict(_)) => info!(email = demo.email, "demo user already present"),
            Err(err) => return Err(err),
        }
    }
    Ok(created)
}
