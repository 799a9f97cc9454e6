use super::Article;

/// Compile-time seed entry; converted to an owned [`Article`] on demand.
struct SeedEntry {
    title: &'static str,
    excerpt: &'static str,
    content: &'static str,
    category: &'static str,
    source_url: &'static str,
    date: &'static str,
    tags: &'static [&'static str],
}

/// Historical reports bundled with the binary. Always available offline.
const HISTORICAL_REPORTS: &[SeedEntry] = &[
    SeedEntry {
        title: "Attention Is All You Need Introduces the Transformer",
        excerpt: "A Google Brain paper replaces recurrence with self-attention and sets a new bar for machine translation.",
        content: "Researchers at Google Brain and Google Research published the Transformer architecture, built entirely on attention mechanisms. By dropping recurrence and convolution, the model trains faster on parallel hardware and reached state-of-the-art BLEU scores on WMT 2014 English-German and English-French translation. The design became the foundation for nearly every large language model that followed.",
        category: "research",
        source_url: "https://arxiv.org/abs/1706.03762",
        date: "2017-06-12",
        tags: &["transformers", "attention", "nlp"],
    },
    SeedEntry {
        title: "AlphaFold 2 Solves Protein Structure Prediction at CASP14",
        excerpt: "DeepMind's system predicts 3D protein structures with accuracy rivaling experimental methods.",
        content: "At the CASP14 assessment, DeepMind's AlphaFold 2 achieved a median GDT score above 90 across targets, a level competitive with laboratory techniques such as X-ray crystallography. Organizers described the fifty-year-old protein folding problem as largely solved for single chains. The team later released predicted structures for hundreds of millions of proteins in a public database.",
        category: "research",
        source_url: "https://deepmind.google/discover/blog/alphafold-a-solution-to-a-50-year-old-grand-challenge-in-biology/",
        date: "2020-11-30",
        tags: &["biology", "deepmind", "science"],
    },
    SeedEntry {
        title: "GPT-3 Demonstrates Few-Shot Learning at 175 Billion Parameters",
        excerpt: "OpenAI shows that scale alone unlocks in-context learning across many tasks.",
        content: "OpenAI described GPT-3, an autoregressive language model with 175 billion parameters trained on a broad web corpus. Without gradient updates, the model performed translation, question answering and arithmetic from a handful of examples in its prompt. The paper framed scale as a path to general capabilities and launched the era of API-delivered foundation models.",
        category: "models",
        source_url: "https://arxiv.org/abs/2005.14165",
        date: "2020-05-28",
        tags: &["llm", "openai", "scaling"],
    },
    SeedEntry {
        title: "ChatGPT Launches as a Free Research Preview",
        excerpt: "A conversational interface to a fine-tuned GPT-3.5 model reaches a million users in five days.",
        content: "OpenAI opened ChatGPT to the public as a research preview. The assistant was trained with reinforcement learning from human feedback to follow instructions and admit mistakes. Adoption was immediate, passing one million users within a week and pushing conversational AI into mainstream products across search, productivity and education.",
        category: "models",
        source_url: "https://openai.com/blog/chatgpt",
        date: "2022-11-30",
        tags: &["chatbots", "rlhf", "openai"],
    },
    SeedEntry {
        title: "Stable Diffusion Released with Open Weights",
        excerpt: "A latent diffusion model capable of running on consumer GPUs is published for anyone to download.",
        content: "Stability AI, together with CompVis and Runway, released Stable Diffusion under a permissive license. Because the latent diffusion approach operates in a compressed space, the model generates high-resolution images on a single consumer graphics card. The open release triggered a wave of community fine-tunes, tooling and debate over training data provenance.",
        category: "tools",
        source_url: "https://stability.ai/news/stable-diffusion-public-release",
        date: "2022-08-22",
        tags: &["diffusion", "open-source", "images"],
    },
    SeedEntry {
        title: "EU Lawmakers Reach Political Agreement on the AI Act",
        excerpt: "The first comprehensive AI regulation sorts systems by risk and sets obligations for general-purpose models.",
        content: "Negotiators from the European Parliament and Council agreed on the AI Act after marathon talks. The law bans certain uses such as social scoring, imposes conformity assessments on high-risk systems, and adds transparency duties for general-purpose AI models, with stricter rules for those posing systemic risk. Obligations phase in over the following years.",
        category: "policy",
        source_url: "https://www.europarl.europa.eu/news/en/press-room",
        date: "2023-12-08",
        tags: &["regulation", "eu", "governance"],
    },
    SeedEntry {
        title: "NVIDIA Unveils the Blackwell GPU Architecture",
        excerpt: "A two-die design targets trillion-parameter training and lower inference cost.",
        content: "NVIDIA announced Blackwell at its GTC conference, pairing two reticle-limited dies with a high-bandwidth chip-to-chip link. The company claimed large gains in inference throughput and energy efficiency over Hopper, along with a new generation of NVLink for rack-scale systems. Cloud providers lined up to deploy the parts for frontier model training.",
        category: "hardware",
        source_url: "https://nvidianews.nvidia.com/",
        date: "2024-03-18",
        tags: &["gpu", "nvidia", "datacenter"],
    },
    SeedEntry {
        title: "Llama 2 Arrives with a Commercial-Use License",
        excerpt: "Meta releases pretrained and chat-tuned models from 7B to 70B parameters.",
        content: "Meta published Llama 2 in partnership with Microsoft, making weights available for research and most commercial use. The release included chat variants tuned with supervised fine-tuning and RLHF, along with a responsible use guide. Open-weight models quickly became a default starting point for enterprises wanting to run models on their own infrastructure.",
        category: "models",
        source_url: "https://ai.meta.com/llama/",
        date: "2023-07-18",
        tags: &["open-weights", "meta", "llm"],
    },
    SeedEntry {
        title: "Humanoid Robot Startups Raise Record Funding",
        excerpt: "Investors bet that foundation models will finally make general-purpose robots practical.",
        content: "A string of large rounds pushed humanoid robotics into the spotlight, with startups pitching robots that learn manipulation skills from video and teleoperation data. Backers argued that multimodal models provide the missing perception and planning layer. Skeptics pointed to hardware cost, safety certification and the long tail of real-world tasks as remaining hurdles.",
        category: "robotics",
        source_url: "https://www.google.com/search?q=humanoid+robot+funding",
        date: "2024-02-29",
        tags: &["humanoids", "funding", "embodied-ai"],
    },
    SeedEntry {
        title: "Enterprises Move Generative AI Pilots into Production",
        excerpt: "Retrieval-augmented assistants become the most common first deployment.",
        content: "Surveys of large companies found a shift from experimentation to production deployments of generative AI, led by internal knowledge assistants built on retrieval-augmented generation. Teams cited evaluation, data governance and cost control as the main obstacles, and many adopted a mix of hosted frontier models and smaller self-hosted models for sensitive workloads.",
        category: "enterprise",
        source_url: "https://www.google.com/search?q=enterprise+generative+ai+production",
        date: "2024-01-16",
        tags: &["rag", "adoption", "enterprise"],
    },
    SeedEntry {
        title: "AI Coding Assistant Startups Draw Developer Adoption",
        excerpt: "Agentic editors that plan and apply multi-file changes gain traction.",
        content: "A new generation of coding tools moved beyond autocomplete toward agents that read a repository, propose a plan and apply edits across files. Startups in the space reported rapid growth among professional developers, while incumbents responded with their own agent modes. Benchmarks such as SWE-bench became the common yardstick for comparing systems.",
        category: "startups",
        source_url: "https://www.google.com/search?q=ai+coding+agents",
        date: "2024-04-10",
        tags: &["coding", "agents", "developer-tools"],
    },
];

/// Build the seed catalog as owned articles.
pub fn seed_catalog() -> Vec<Article> {
    HISTORICAL_REPORTS
        .iter()
        .map(|entry| Article {
            title: entry.title.to_owned(),
            excerpt: entry.excerpt.to_owned(),
            content: entry.content.to_owned(),
            category: entry.category.to_owned(),
            source_url: entry.source_url.to_owned(),
            date: entry.date.to_owned(),
            tags: entry.tags.iter().map(|t| (*t).to_owned()).collect(),
        })
        .collect()
}
